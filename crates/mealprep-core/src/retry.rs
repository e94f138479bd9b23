//! # Retry Policy
//!
//! Pure decision functions: is a failure worth resubmitting, and the bounds
//! of the exponential backoff between attempts. The client turns the bounds
//! into a `backoff::ExponentialBackoff` with no jitter.
//!
//! ## Backoff Schedule (defaults)
//! ```text
//! attempt │ delay
//! ────────┼────────────────────────────
//!    0    │ 1000 ms
//!    1    │ 2000 ms
//!    2    │ 4000 ms
//!    n    │ min(1000 * 2^n, 30000) ms
//! ```
//!
//! The same retry budget is shared by HTTP-status retries and transport
//! (timeout / connection) retries of one request.

use std::time::Duration;

/// Default number of resubmissions after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay of the exponential backoff.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default upper bound of any single backoff delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Returns true if a response status should be retried.
///
/// 408 (request timeout), 429 (rate limited) and every 5xx are transient;
/// other statuses are business outcomes and surface immediately.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Resubmissions allowed after the first attempt.
    pub max_retries: u32,

    /// Delay before the first resubmission.
    pub base_delay: Duration,

    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// A policy that never resubmits.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Returns true if attempt number `attempt` (0-based) may be followed by
    /// another one.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Returns true if a response with `status` at `attempt` should be
    /// resubmitted.
    pub fn should_retry_status(&self, status: u16, attempt: u32) -> bool {
        is_retryable_status(status) && self.should_retry(attempt)
    }
}
