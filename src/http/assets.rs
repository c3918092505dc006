//! Demo web client routes.
//!
//! A fixed set of files is served from the static root; anything missing
//! is a 404. Two small documents are generated in memory so browsers stop
//! probing for them.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::config::StaticConfig;

const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

const SERVICE_WORKER: &str = "self.addEventListener('install',()=>self.skipWaiting());self.addEventListener('activate',evt=>evt.waitUntil(self.clients.claim()));self.addEventListener('fetch',()=>{})";

/// A file served verbatim from the static root.
#[derive(Debug)]
struct Asset {
    route: &'static str,
    file: &'static str,
    media_type: &'static str,
    no_store: bool,
}

const ASSETS: &[Asset] = &[
    Asset { route: "/feedcycle.html", file: "feedcycle.html", media_type: "text/html; charset=utf-8", no_store: true },
    Asset { route: "/feedcycle.js", file: "feedcycle.js", media_type: "application/javascript", no_store: true },
    Asset { route: "/feedcycle.css", file: "feedcycle.css", media_type: "text/css", no_store: true },
    Asset { route: "/assets/js/pwa.js", file: "assets/js/pwa.js", media_type: "application/javascript", no_store: false },
    Asset { route: "/assets/js/version.js", file: "assets/js/version.js", media_type: "application/javascript", no_store: false },
    Asset { route: "/parental.js", file: "parental.js", media_type: "application/javascript", no_store: false },
    Asset { route: "/manifest.webmanifest", file: "manifest.webmanifest", media_type: "application/manifest+json", no_store: false },
    Asset { route: "/favicon.ico", file: "favicon.ico", media_type: "image/x-icon", no_store: false },
];

/// Routes for the demo client rooted at `config.root`.
pub fn router(config: &StaticConfig) -> Router {
    let root = Arc::new(config.root.clone());

    let mut router = Router::new()
        .route("/", get(|| async { Redirect::temporary("/feedcycle.html") }))
        .route("/sw.js", get(service_worker))
        .route(
            "/.well-known/appspecific/com.chrome.devtools.json",
            get(devtools_manifest),
        );

    for asset in ASSETS {
        let root = root.clone();
        router = router.route(asset.route, get(move || serve_asset(root.clone(), asset)));
    }

    router.nest_service(
        "/assets/appicons",
        ServeDir::new(config.root.join("assets").join("appicons")),
    )
}

async fn serve_asset(root: Arc<PathBuf>, asset: &'static Asset) -> Response {
    let path = root.join(asset.file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Static file unavailable");
            let body = Json(json!({ "detail": format!("Missing {}", asset.file) }));
            return (StatusCode::NOT_FOUND, body).into_response();
        }
    };

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(asset.media_type));
    if asset.no_store {
        headers.insert(CACHE_CONTROL, NO_STORE);
    }
    response
}

/// Minimal no-op service worker so the PWA loader stops polling.
async fn service_worker() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/javascript")),
            (CACHE_CONTROL, NO_STORE),
        ],
        SERVICE_WORKER,
    )
}

/// Chrome devtools probes this path; answer with an empty document.
async fn devtools_manifest() -> impl IntoResponse {
    ([(CACHE_CONTROL, NO_STORE)], Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::LOCATION, Request};
    use tower::ServiceExt;

    fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("cors-proxy-assets-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("assets").join("appicons")).unwrap();
        root
    }

    async fn get_path(router: Router, path: &str) -> Response {
        router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects_to_client() {
        let router = router(&StaticConfig { enabled: true, root: temp_root() });
        let response = get_path(router, "/").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/feedcycle.html");
    }

    #[tokio::test]
    async fn test_serves_present_file_with_media_type() {
        let root = temp_root();
        std::fs::write(root.join("feedcycle.html"), "<html></html>").unwrap();
        let router = router(&StaticConfig { enabled: true, root });

        let response = get_path(router, "/feedcycle.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html></html>");
    }

    #[tokio::test]
    async fn test_missing_files_are_404() {
        let root = temp_root();
        for path in ["/feedcycle.js", "/favicon.ico", "/assets/js/pwa.js", "/assets/appicons/icon-192.png"] {
            let response = get_path(router(&StaticConfig { enabled: true, root: root.clone() }), path).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn test_icon_directory_is_served() {
        let root = temp_root();
        std::fs::write(root.join("assets/appicons/icon.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let router = router(&StaticConfig { enabled: true, root });

        let response = get_path(router, "/assets/appicons/icon.png").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generated_documents() {
        let root = temp_root();
        let response = get_path(router(&StaticConfig { enabled: true, root: root.clone() }), "/sw.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");

        let response = get_path(
            router(&StaticConfig { enabled: true, root }),
            "/.well-known/appspecific/com.chrome.devtools.json",
        )
        .await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{}");
    }
}
