//! CORS proxy (v1)
//!
//! Relays `GET /raw?url=...` to arbitrary upstream hosts so browser code on
//! another origin can read the response, and serves a small demo client.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                   CORS PROXY                     │
//!                              │                                                  │
//!     Browser Request          │  ┌─────────┐    ┌─────────┐    ┌─────────────┐   │
//!     ─────────────────────────┼─▶│  cors   │───▶│  http   │───▶│   routing   │   │
//!                              │  │ + PNA   │    │ server  │    │   target    │   │
//!                              │  └─────────┘    └─────────┘    └──────┬──────┘   │
//!                              │                                       │          │
//!                              │                                       ▼          │
//!                              │                               ┌─────────────┐    │
//!                              │                               │ resilience  │    │
//!                              │                               │   ledger    │    │
//!                              │                               └──────┬──────┘    │
//!                              │                                       │          │
//!                              │                                       ▼          │
//!     Browser Response         │  ┌─────────┐    ┌─────────┐    ┌─────────────┐   │
//!     ◀────────────────────────┼──│response │◀───│security │◀───│  upstream   │◀──┼── Upstream
//!                              │  │ mapping │    │ headers │    │  forwarder  │   │    Host
//!                              │  └─────────┘    └─────────┘    └─────────────┘   │
//!                              └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use cors_proxy::config::{self, loader, HostKeyMode, ProxyConfig};
use cors_proxy::lifecycle::startup;
use cors_proxy::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "cors-proxy")]
#[command(about = "CORS proxy with per-host upstream backoff", long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override it
    #[arg(short, long, env = "CORS_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long, env = "CORS_PROXY_HOST")]
    host: Option<String>,

    /// Bind port
    #[arg(long, env = "CORS_PROXY_PORT")]
    port: Option<u16>,

    /// Upstream request timeout (seconds)
    #[arg(long, env = "CORS_PROXY_TIMEOUT")]
    timeout: Option<f64>,

    /// Base backoff for 429 responses and connection failures
    #[arg(long, value_name = "SECONDS", env = "CORS_PROXY_BACKOFF_BASE")]
    backoff_base: Option<u64>,

    /// Maximum backoff for repeated 429 responses
    #[arg(long, value_name = "SECONDS", env = "CORS_PROXY_BACKOFF_MAX")]
    backoff_max: Option<u64>,

    /// Backoff duration for long-backoff statuses
    #[arg(long, value_name = "SECONDS", env = "CORS_PROXY_LONG_BACKOFF")]
    long_backoff: Option<u64>,

    /// Status treated as a long-backoff signal (repeatable; default 403, 404, 500)
    #[arg(long = "long-backoff-status", value_name = "STATUS", value_delimiter = ',', env = "CORS_PROXY_LONG_BACKOFF_STATUSES")]
    long_backoff_statuses: Vec<u16>,

    /// Allowed Origin for CORS (repeatable; default: allow all)
    #[arg(long = "allow-origin", value_name = "ORIGIN", value_delimiter = ',', env = "CORS_PROXY_ALLOW_ORIGINS")]
    allow_origins: Vec<String>,

    /// Key backoff by host:port instead of hostname
    #[arg(long)]
    host_key_port: bool,

    /// Directory to serve the demo client from
    #[arg(long, env = "CORS_PROXY_STATIC_ROOT")]
    static_root: Option<PathBuf>,

    /// Disable static file serving
    #[arg(long)]
    no_static: bool,

    /// Log level
    #[arg(long, env = "CORS_PROXY_LOG_LEVEL", value_parser = ["error", "warn", "info", "debug", "trace"])]
    log_level: Option<String>,
}

impl Cli {
    /// Layer command-line values over `config`.
    fn apply(self, config: &mut ProxyConfig) {
        if self.host.is_some() || self.port.is_some() {
            let (current_host, current_port) = split_bind_address(&config.listener.bind_address);
            let host = self.host.unwrap_or(current_host);
            let port = self.port.unwrap_or(current_port);
            config.listener.bind_address = if host.contains(':') && !host.starts_with('[') {
                format!("[{host}]:{port}")
            } else {
                format!("{host}:{port}")
            };
        }
        if let Some(timeout) = self.timeout {
            config.upstream.timeout_secs = timeout;
        }
        if let Some(base) = self.backoff_base {
            config.backoff.base_secs = base;
        }
        if let Some(max) = self.backoff_max {
            config.backoff.max_secs = max;
        }
        if let Some(long) = self.long_backoff {
            config.backoff.long_secs = long;
        }
        if !self.long_backoff_statuses.is_empty() {
            config.backoff.long_statuses = self.long_backoff_statuses;
        }
        if !self.allow_origins.is_empty() {
            config.cors.allow_origins = self.allow_origins;
        }
        if self.host_key_port {
            config.upstream.host_key = HostKeyMode::HostPort;
        }
        if let Some(root) = self.static_root {
            config.static_files.root = root;
        }
        if self.no_static {
            config.static_files.enabled = false;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

fn split_bind_address(bind: &str) -> (String, u16) {
    match bind.rsplit_once(':') {
        Some((host, port)) => (
            host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port.parse().unwrap_or(8000),
        ),
        None => (bind.to_string(), 8000),
    }
}

fn build_config(cli: Cli) -> Result<ProxyConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(Cli::parse())?;
    logging::init(&config.observability.log_level);

    let config = match loader::finalize(config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream_timeout_secs = config.upstream.timeout_secs,
        backoff_base_secs = config.backoff.base_secs,
        backoff_max_secs = config.backoff.max_secs,
        long_backoff_secs = config.backoff.long_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;
    Ok(())
}
