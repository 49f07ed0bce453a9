//! Retry delay calculation.
//!
//! Pure functions only; the executor owns the actual sleeping.

use std::time::Duration;

/// Upper bound on any single wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Base unit for non-429 failures unless configured otherwise.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Base unit for 429 responses without a usable `Retry-After`.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Exponential backoff with a fixed cap and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

impl BackoffPolicy {
    /// A zero `initial` falls back to [`DEFAULT_INITIAL_BACKOFF`].
    pub fn new(initial: Duration) -> Self {
        if initial.is_zero() {
            Self::default()
        } else {
            Self { initial }
        }
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    ///
    /// A positive `Retry-After` on a 429 wins outright (still capped).
    /// Otherwise the base doubles per attempt until it hits [`MAX_BACKOFF`].
    pub fn delay(&self, attempt: u32, status: u16, retry_after: Option<&str>) -> Duration {
        if status == 429
            && let Some(seconds) = retry_after.and_then(parse_retry_after)
        {
            return Duration::from_secs(seconds).min(MAX_BACKOFF);
        }

        let base = if status == 429 {
            RATE_LIMIT_BACKOFF
        } else {
            self.initial
        };
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// [`BackoffPolicy::delay`] with the default 1 s base unit.
pub fn backoff(attempt: u32, status: u16, retry_after: Option<&str>) -> Duration {
    BackoffPolicy::default().delay(attempt, status, retry_after)
}

/// Positive whole seconds, or `None`.
pub(crate) fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|s| *s > 0)
}
