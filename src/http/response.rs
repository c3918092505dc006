//! Response mapping.
//!
//! # Responsibilities
//! - Turn forwarded upstream responses into client responses
//! - Map typed proxy failures to status codes and Retry-After hints
//!
//! # Design Decisions
//! - No policy here: every decision was already made by the forwarder
//! - Error bodies are JSON `{"detail": "..."}`

use axum::{
    body::Body,
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ProxyError;
use crate::upstream::ForwardedResponse;

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        let mut response = (self.status_code(), body).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
