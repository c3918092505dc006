//! Target URL validation.
//!
//! # Responsibilities
//! - Reject empty targets and anything that is not an absolute http(s) URL
//! - Normalize the URL (the `url` crate lowercases the host, drops default ports)
//! - Derive the host key the backoff ledger is indexed by
//!
//! # Design Decisions
//! - Pure function, no I/O
//! - Host keys are hostname-only unless configured to include the port

use url::Url;

use crate::config::HostKeyMode;
use crate::error::ProxyError;

pub const MISSING_URL: &str = "missing url";
pub const SCHEME_HOST_REQUIRED: &str = "scheme/host required";

/// A caller-supplied URL that is safe to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTarget {
    /// Normalized absolute URL.
    pub url: Url,
    /// Backoff ledger key.
    pub host: String,
}

impl ValidatedTarget {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Validate `raw` and derive its ledger key.
pub fn validate(raw: &str, mode: HostKeyMode) -> Result<ValidatedTarget, ProxyError> {
    if raw.is_empty() {
        return Err(ProxyError::invalid(MISSING_URL));
    }

    let url = Url::parse(raw).map_err(|_| ProxyError::invalid(SCHEME_HOST_REQUIRED))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::invalid(SCHEME_HOST_REQUIRED));
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => return Err(ProxyError::invalid(SCHEME_HOST_REQUIRED)),
    };

    let host = match (mode, url.port_or_known_default()) {
        (HostKeyMode::HostPort, Some(port)) => format!("{host}:{port}"),
        _ => host,
    };

    Ok(ValidatedTarget { url, host })
}
