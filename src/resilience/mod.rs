//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream host:
//!     → ledger.rs (reject early while the host is backing off)
//!     → upstream fetch
//!     → ledger.rs (register failure or clear on success)
//!         → backoff.rs (delay arithmetic, Retry-After parsing)
//!         → clock.rs (time source)
//! ```
//!
//! # Design Decisions
//! - Backoff state is in-memory only and lost on restart
//! - Expiry is checked on read; there is no background sweeper
//! - No retry loop inside the proxy; clients are told when to come back

pub mod backoff;
pub mod clock;
pub mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{BackoffKind, BackoffLedger, BackoffRecord};
