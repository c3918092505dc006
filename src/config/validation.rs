//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff ordering, status codes)
//! - Keep the upstream timeout inside the request timeout so upstream
//!   failures are reported by the proxy, not cut off by the listener
//! - Check addresses and origins parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::ProxyConfig;
use crate::resilience::backoff::MAX_BACKOFF_SECS;

/// Upper bound for either timeout (one day).
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    let request_timeout = config.listener.request_timeout_secs;
    if request_timeout == 0 || request_timeout > MAX_TIMEOUT_SECS {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!("must be between 1 and {MAX_TIMEOUT_SECS}"),
        ));
    }

    let timeout = config.upstream.timeout_secs;
    if !timeout.is_finite() || timeout <= 0.0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be a positive number"));
    } else if timeout >= request_timeout as f64 {
        errors.push(ValidationError::new(
            "upstream.timeout_secs",
            format!("must be less than listener.request_timeout_secs ({request_timeout})"),
        ));
    }

    let backoff = &config.backoff;
    if backoff.base_secs == 0 {
        errors.push(ValidationError::new("backoff.base_secs", "must be positive"));
    }
    if backoff.max_secs < backoff.base_secs {
        errors.push(ValidationError::new(
            "backoff.max_secs",
            format!("must be at least base_secs ({})", backoff.base_secs),
        ));
    }
    if backoff.max_secs > MAX_BACKOFF_SECS {
        errors.push(ValidationError::new(
            "backoff.max_secs",
            format!("must be at most {MAX_BACKOFF_SECS}"),
        ));
    }
    if backoff.long_secs == 0 {
        errors.push(ValidationError::new("backoff.long_secs", "must be positive"));
    } else if backoff.long_secs > MAX_BACKOFF_SECS {
        errors.push(ValidationError::new(
            "backoff.long_secs",
            format!("must be at most {MAX_BACKOFF_SECS}"),
        ));
    }
    for status in &backoff.long_statuses {
        if !(100..=599).contains(status) {
            errors.push(ValidationError::new(
                "backoff.long_statuses",
                format!("{status} is not an HTTP status code"),
            ));
        }
    }

    for origin in &config.cors.allow_origins {
        if origin == "*" || HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allow_origins",
                format!("'{origin}' is not a valid origin (leave the list empty to allow all)"),
            ));
        }
    }
    for name in &config.cors.expose_headers {
        if name.parse::<axum::http::HeaderName>().is_err() {
            errors.push(ValidationError::new(
                "cors.expose_headers",
                format!("'{name}' is not a header name"),
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
