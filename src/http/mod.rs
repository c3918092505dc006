//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → /raw handler → routing::target → upstream::forwarder
//!     → response.rs (status + Retry-After mapping)
//!     → Send to client
//!
//! Demo client paths:
//!     → assets.rs (fixed files, 404 when absent)
//! ```

pub mod assets;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
