//! Exponential backoff arithmetic.

/// Longest delay the ledger will ever impose, whatever the policy or the
/// upstream asks for (one year).
pub const MAX_BACKOFF_SECS: u64 = 365 * 24 * 60 * 60;

/// Delay in seconds for the `attempt`-th consecutive short backoff.
///
/// `base * 2^(attempt - 1)`, capped at `max_secs`. Attempt 0 means no backoff.
pub fn exponential_delay(attempt: u32, base_secs: u64, max_secs: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    base_secs.saturating_mul(factor).min(max_secs)
}

/// Parse a `Retry-After` value given in seconds.
///
/// Fractional values are floored. Negative, non-finite and non-numeric
/// values (including the HTTP-date form) yield `None`.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(secs.floor() as u64)
}
