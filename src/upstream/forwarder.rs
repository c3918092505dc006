//! Request forwarding with per-host backoff.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};

use crate::error::ProxyError;
use crate::observability::metrics;
use crate::resilience::ledger::{BackoffKind, BackoffLedger};
use crate::routing::ValidatedTarget;
use crate::security::headers::{outbound_headers, sanitize_response_headers};
use crate::upstream::client::{UpstreamClient, UpstreamRequest};

/// Status recorded in the ledger when the upstream cannot be reached.
pub const CONNECTION_FAILED_STATUS: u16 = 503;

/// An upstream response ready to hand back to the browser.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardedResponse {
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }
}

/// Fetches validated targets and keeps the backoff ledger in step with what
/// upstream hosts report.
pub struct Forwarder<C> {
    client: C,
    ledger: Arc<BackoffLedger>,
}

impl<C: UpstreamClient> Forwarder<C> {
    pub fn new(client: C, ledger: Arc<BackoffLedger>) -> Self {
        Self { client, ledger }
    }

    pub fn ledger(&self) -> &BackoffLedger {
        &self.ledger
    }

    /// Forward a GET for `target`, using `inbound` for caller identity headers.
    pub async fn forward(
        &self,
        target: &ValidatedTarget,
        inbound: &HeaderMap,
    ) -> Result<ForwardedResponse, ProxyError> {
        let host = target.host.as_str();

        if let Some(wait) = self.ledger.check_active(host) {
            tracing::info!(host = %host, retry_after = wait, "Rejecting request, host is backing off");
            return Err(ProxyError::Throttled { retry_after: wait });
        }

        let request = UpstreamRequest {
            url: target.url.clone(),
            headers: outbound_headers(inbound, target.as_str()),
        };

        let start = Instant::now();
        let result = self.client.get(request).await;
        metrics::record_upstream_latency(start);

        let upstream = match result {
            Ok(upstream) => upstream,
            Err(e) => {
                let delay = self.ledger.register_failure(host, CONNECTION_FAILED_STATUS, None);
                tracing::warn!(host = %host, error = %e, retry_after = delay, "Upstream unreachable");
                return Err(ProxyError::UpstreamUnreachable {
                    retry_after: delay,
                    reason: e.to_string(),
                });
            }
        };

        let status = upstream.status;
        let mut headers = sanitize_response_headers(&upstream.headers);

        let code = status.as_u16();
        if status == StatusCode::TOO_MANY_REQUESTS || self.ledger.classify(code) == BackoffKind::Long {
            let requested = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok());
            let delay = self.ledger.register_failure(host, code, requested);
            headers.insert(RETRY_AFTER, HeaderValue::from(delay));
        } else {
            self.ledger.clear(host);
        }

        tracing::debug!(host = %host, status = code, bytes = upstream.body.len(), "Upstream responded");

        Ok(ForwardedResponse {
            status,
            headers,
            body: upstream.body,
        })
    }
}
