//! Retry backoff shared by the scheduler and the database connector.

use std::time::Duration;

/// Linear backoff: the wait before retry `attempt` is `base * attempt`.
///
/// `attempt` is 1-based (the first retry waits one `base`). Saturates instead
/// of overflowing for absurd attempt counts.
pub fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}
