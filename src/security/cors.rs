//! Cross-origin access for browser clients.
//!
//! # Responsibilities
//! - Answer CORS preflights and decorate every response
//! - Answer Private Network Access requests from public pages
//!
//! # Design Decisions
//! - An empty origin list means "any origin"; because credentials are
//!   allowed, the request's own Origin is echoed instead of `*`
//! - Methods and request headers are mirrored for the same reason

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::config::CorsConfig;

pub const REQUEST_PRIVATE_NETWORK: HeaderName =
    HeaderName::from_static("access-control-request-private-network");
pub const ALLOW_PRIVATE_NETWORK: HeaderName =
    HeaderName::from_static("access-control-allow-private-network");

/// Build the CORS layer for the configured allow-list.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %o, error = %e, "Skipping invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    let exposed: Vec<HeaderName> = config
        .expose_headers
        .iter()
        .filter_map(|h| match h.parse() {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(header = %h, error = %e, "Skipping invalid exposed header");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers(ExposeHeaders::list(exposed))
}

/// Adds `Access-Control-Allow-Private-Network: true` when the browser asks for it.
pub async fn private_network_middleware(request: Request<Body>, next: Next) -> Response {
    let wants_private_network = request
        .headers()
        .get(REQUEST_PRIVATE_NETWORK)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let mut response = next.run(request).await;
    if wants_private_network {
        response
            .headers_mut()
            .insert(ALLOW_PRIVATE_NETWORK, HeaderValue::from_static("true"));
    }
    response
}
