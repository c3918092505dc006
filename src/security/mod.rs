//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, origin allow-list, private network access)
//!     → handler
//!         → headers.rs (outbound identity defaults)
//!         → upstream fetch
//!         → headers.rs (strip hop-by-hop and framing headers)
//! ```
//!
//! # Design Decisions
//! - Browser credentials are never forwarded upstream
//! - Upstream framing is never trusted; the proxy re-frames every body

pub mod cors;
pub mod headers;
