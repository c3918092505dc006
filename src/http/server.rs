//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy and demo-client handlers
//! - Wire up middleware (request ID, tracing, timeout, CORS, private network)
//! - Validate `/raw` targets and hand them to the forwarder
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request},
    middleware,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{HostKeyMode, ProxyConfig};
use crate::error::ProxyError;
use crate::http::assets;
use crate::http::request::{request_id, UuidRequestId};
use crate::observability::metrics;
use crate::resilience::BackoffLedger;
use crate::routing::validate;
use crate::security::cors::{cors_layer, private_network_middleware};
use crate::upstream::{ForwardedResponse, Forwarder, ReqwestClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder<ReqwestClient>>,
    pub host_key: HostKeyMode,
}

/// Query string of `GET /raw`.
#[derive(Debug, Deserialize)]
pub struct RawParams {
    pub url: Option<String>,
}

/// HTTP server for the CORS proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Builds the pooled upstream client; fails only if the TLS backend
    /// cannot be initialised.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let ledger = Arc::new(BackoffLedger::new(config.backoff.clone()));
        let client = ReqwestClient::new(&config.upstream)?;

        let state = AppState {
            forwarder: Arc::new(Forwarder::new(client, ledger)),
            host_key: config.upstream.host_key,
        };

        Ok(Self {
            router: Self::build_router(config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// CORS sits outside the timeout so a listener timeout is still readable
    /// by the browser.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/raw", get(raw_handler))
            .with_state(state);

        if config.static_files.enabled {
            router = router.merge(assets::router(&config.static_files));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(cors_layer(&config.cors))
            .layer(middleware::from_fn(private_network_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `GET /raw?url=...`: fetch `url` on the caller's behalf.
async fn raw_handler(
    State(state): State<AppState>,
    Query(params): Query<RawParams>,
    headers: HeaderMap,
) -> Result<ForwardedResponse, ProxyError> {
    let raw = params.url.unwrap_or_default();

    let result = match validate(&raw, state.host_key) {
        Ok(target) => state.forwarder.forward(&target, &headers).await,
        Err(e) => {
            tracing::debug!(url = %raw, error = %e, "Rejected proxy target");
            Err(e)
        }
    };

    match &result {
        Ok(response) => metrics::record_forward("forwarded", response.status.as_u16()),
        Err(e) => {
            let outcome = match e {
                ProxyError::InvalidRequest(_) => "invalid",
                ProxyError::Throttled { .. } => "throttled",
                ProxyError::UpstreamUnreachable { .. } => "unreachable",
            };
            metrics::record_forward(outcome, e.status_code().as_u16());
        }
    }

    result
}
