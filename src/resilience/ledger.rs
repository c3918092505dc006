//! Per-host backoff ledger.
//!
//! # States
//! - Absent: requests to the host go upstream
//! - Backing off: requests are rejected until `resume_at`
//!
//! # State Transitions
//! ```text
//! Absent → Backing off: throttling status or transport failure
//! Backing off → Backing off: another throttling status (record overwritten)
//! Backing off → Absent: successful response, or first lookup after expiry
//! ```
//!
//! Every operation takes one short-lived lock and never awaits, so callers
//! must not hold anything from the ledger across the upstream round-trip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::BackoffConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{exponential_delay, parse_retry_after, MAX_BACKOFF_SECS};
use crate::resilience::clock::{Clock, SystemClock};

/// Active backoff window for one upstream host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffRecord {
    pub host: String,
    pub resume_at: Instant,
    /// Consecutive throttling responses since the last success.
    pub attempts: u32,
    /// Status that produced this record.
    pub last_status: u16,
}

/// How a status code is penalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// Fixed, long suppression (403/404/500 by default).
    Long,
    /// Exponential suppression (429, transport failures).
    Short,
}

impl BackoffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffKind::Long => "long",
            BackoffKind::Short => "short",
        }
    }
}

/// Process-wide mapping from upstream host to its backoff window.
pub struct BackoffLedger {
    records: Mutex<HashMap<String, BackoffRecord>>,
    policy: BackoffConfig,
    clock: Arc<dyn Clock>,
}

impl BackoffLedger {
    pub fn new(policy: BackoffConfig) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: BackoffConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            policy,
            clock,
        }
    }

    /// Classify a throttling status.
    pub fn classify(&self, status: u16) -> BackoffKind {
        if self.policy.long_statuses.contains(&status) {
            BackoffKind::Long
        } else {
            BackoffKind::Short
        }
    }

    /// Seconds until `host` may be contacted again, or `None` if it may be
    /// contacted now. Expired records are dropped on the way.
    pub fn check_active(&self, host: &str) -> Option<u64> {
        let now = self.clock.now();
        let mut records = self.records.lock().expect("backoff ledger mutex poisoned");

        let resume_at = records.get(host)?.resume_at;
        if resume_at <= now {
            records.remove(host);
            tracing::debug!(host = %host, "Backoff expired");
            return None;
        }

        Some(ceil_secs(resume_at - now))
    }

    /// Record a throttling outcome for `host` and return the imposed delay in
    /// seconds. An upstream `Retry-After` can only lengthen the delay, and no
    /// delay exceeds [`MAX_BACKOFF_SECS`].
    pub fn register_failure(&self, host: &str, status: u16, retry_after: Option<&str>) -> u64 {
        let kind = self.classify(status);
        let requested = retry_after.and_then(parse_retry_after);

        let now = self.clock.now();
        let mut records = self.records.lock().expect("backoff ledger mutex poisoned");

        let (attempts, mut delay) = match kind {
            BackoffKind::Long => (1, self.policy.long_secs),
            BackoffKind::Short => {
                let prior = records.get(host).map(|r| r.attempts).unwrap_or(0);
                let attempts = prior.saturating_add(1);
                let delay = exponential_delay(attempts, self.policy.base_secs, self.policy.max_secs);
                (attempts, delay)
            }
        };

        if let Some(requested) = requested {
            delay = delay.max(requested);
        }
        delay = delay.min(MAX_BACKOFF_SECS);
        let resume_at = now.checked_add(Duration::from_secs(delay)).unwrap_or(now);

        records.insert(
            host.to_string(),
            BackoffRecord {
                host: host.to_string(),
                resume_at,
                attempts,
                last_status: status,
            },
        );
        drop(records);

        tracing::warn!(
            host = %host,
            status = status,
            kind = kind.as_str(),
            attempts = attempts,
            delay_secs = delay,
            "Upstream backoff registered"
        );
        metrics::record_backoff(kind.as_str());

        delay
    }

    /// Forget any backoff for `host`.
    pub fn clear(&self, host: &str) {
        let removed = self
            .records
            .lock()
            .expect("backoff ledger mutex poisoned")
            .remove(host);

        if let Some(record) = removed {
            tracing::debug!(host = %host, last_status = record.last_status, "Backoff cleared");
        }
    }

    /// Copy of the current record for `host`, expired or not.
    pub fn record(&self, host: &str) -> Option<BackoffRecord> {
        self.records
            .lock()
            .expect("backoff ledger mutex poisoned")
            .get(host)
            .cloned()
    }

    /// Number of hosts with a record, including ones not yet lazily expired.
    pub fn len(&self) -> usize {
        self.records.lock().expect("backoff ledger mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
