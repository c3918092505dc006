//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ValidatedTarget + inbound headers
//!     → forwarder.rs (ledger check, build request)
//!     → client.rs (GET with deadline)
//!     → forwarder.rs (sanitize headers, update ledger)
//!     → ForwardedResponse or ProxyError
//! ```
//!
//! # Design Decisions
//! - The ledger lock is never held across the upstream round-trip
//! - No retry loop; clients retry on their own, guided by Retry-After
//! - Upstream 4xx/5xx are forwarded verbatim, not turned into proxy errors

pub mod client;
pub mod forwarder;

pub use client::{FetchError, ReqwestClient, UpstreamClient, UpstreamRequest, UpstreamResponse};
pub use forwarder::{ForwardedResponse, Forwarder};
