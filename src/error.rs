//! Proxy error taxonomy.

/// Failures surfaced by the `/raw` endpoint.
///
/// Upstream 4xx/5xx responses are not errors; they are forwarded as data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The caller sent a missing or unusable target URL.
    #[error("{0}")]
    InvalidRequest(String),

    /// The target host is inside a backoff window.
    #[error("Backoff in effect for upstream host")]
    Throttled { retry_after: u64 },

    /// The upstream could not be reached at the transport level.
    #[error("Upstream connection failed: {reason}")]
    UpstreamUnreachable { retry_after: u64, reason: String },
}

impl ProxyError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ProxyError::InvalidRequest(message.into())
    }

    /// Seconds the client should wait before retrying, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ProxyError::InvalidRequest(_) => None,
            ProxyError::Throttled { retry_after } => Some(*retry_after),
            ProxyError::UpstreamUnreachable { retry_after, .. } => Some(*retry_after),
        }
    }
}
