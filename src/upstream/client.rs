//! HTTP client used to reach upstream hosts.
//!
//! # Responsibilities
//! - Perform a single GET with a hard deadline
//! - Follow redirects and decode compressed bodies
//! - Buffer the body so the proxy can re-frame it
//!
//! # Design Decisions
//! - One pooled client per process, created at startup
//! - Transport failures (DNS, connect, timeout, broken body) are one error class

use std::future::Future;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::UpstreamConfig;

const MAX_REDIRECTS: usize = 10;

/// A GET request about to be sent upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure talking to an upstream.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Something that can fetch a URL. The forwarder is generic over this so it
/// can be driven without a network.
pub trait UpstreamClient: Send + Sync + 'static {
    fn get(
        &self,
        request: UpstreamRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, FetchError>> + Send;
}

/// [`UpstreamClient`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(Policy::limited(MAX_REDIRECTS));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }
}

impl UpstreamClient for ReqwestClient {
    async fn get(&self, request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        let response = self
            .inner
            .get(request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
