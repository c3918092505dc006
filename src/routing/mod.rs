//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! GET /raw?url=<target>
//!     → target.rs (parse, scheme/host checks, host key)
//!     → Return: ValidatedTarget or InvalidRequest
//! ```
//!
//! # Design Decisions
//! - The proxy never rewrites paths; the target URL is fetched as given
//! - Deterministic: same input always yields the same host key

pub mod target;

pub use target::{validate, ValidatedTarget};
