//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the CORS proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, inbound timeout).
    pub listener: ListenerConfig,

    /// Upstream fetch settings.
    pub upstream: UpstreamConfig,

    /// Per-host backoff policy.
    pub backoff: BackoffConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Demo web client served next to the proxy.
    pub static_files: StaticConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind_address: String,

    /// Upper bound on handling one inbound request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// How the backoff key is derived from a target URL.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyMode {
    /// Hostname only; all ports share one backoff window.
    #[default]
    Host,
    /// `host:port`, with the scheme's default port filled in.
    HostPort,
}

/// Upstream fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Total time allowed for one upstream fetch, in seconds.
    pub timeout_secs: f64,

    /// Backoff key derivation.
    pub host_key: HostKeyMode,

    /// Honour HTTP(S)_PROXY style environment variables.
    pub use_system_proxy: bool,
}

impl UpstreamConfig {
    /// Values that are not a representable duration fall back to the
    /// longest accepted timeout.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or(Duration::from_secs(crate::config::validation::MAX_TIMEOUT_SECS))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 12.0,
            host_key: HostKeyMode::Host,
            use_system_proxy: true,
        }
    }
}

/// Backoff policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    /// First short backoff delay, doubled on each consecutive failure.
    pub base_secs: u64,

    /// Ceiling for short backoff delays.
    pub max_secs: u64,

    /// Fixed delay for long-backoff statuses.
    pub long_secs: u64,

    /// Statuses treated as near-permanent failures.
    pub long_statuses: Vec<u16>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: 30,
            max_secs: 900,
            long_secs: 86_400,
            long_statuses: vec![403, 404, 500],
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    pub allow_origins: Vec<String>,

    /// Response headers readable by browser scripts.
    pub expose_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            expose_headers: vec!["retry-after".to_string()],
        }
    }
}

/// Static file configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaticConfig {
    /// Serve the demo client routes.
    pub enabled: bool,

    /// Directory the demo client files live in.
    pub root: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("."),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
