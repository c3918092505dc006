//! Header manipulation for forwarded requests and responses.
//!
//! # Responsibilities
//! - Fill in browser-like identity headers the caller did not send
//! - Strip hop-by-hop headers from upstream responses
//! - Drop framing headers the proxy recomputes (length, encoding)
//!
//! # Design Decisions
//! - `HeaderMap` names are already lowercase, so comparisons are case-insensitive
//! - Headers listed in the upstream `Connection` value are hop-by-hop too
//! - Only the identity headers below are sent upstream; cookies and
//!   credentials from the browser are never forwarded

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_ENCODING,
    CONTENT_LENGTH, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, REFERER, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE, USER_AGENT,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str =
    "application/rss+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.7";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Headers that only describe a single transport leg.
pub const HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Build the outbound header set for an upstream fetch of `target_url`.
///
/// Caller values win; empty or missing values fall back to defaults, and the
/// referer falls back to the target itself.
pub fn outbound_headers(inbound: &HeaderMap, target_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(4);

    let defaults = [
        (USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT)),
        (ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT)),
        (ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE)),
    ];
    for (name, fallback) in defaults {
        let value = caller_value(inbound, &name).unwrap_or(fallback);
        headers.insert(name, value);
    }

    let referer = caller_value(inbound, &REFERER).or_else(|| HeaderValue::from_str(target_url).ok());
    if let Some(referer) = referer {
        headers.insert(REFERER, referer);
    }

    headers
}

fn caller_value(inbound: &HeaderMap, name: &HeaderName) -> Option<HeaderValue> {
    inbound.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Copy `upstream` minus hop-by-hop and re-framed headers.
pub fn sanitize_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = upstream
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name)
            || name == CONTENT_LENGTH
            || name == CONTENT_ENCODING
            || listed.contains(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
