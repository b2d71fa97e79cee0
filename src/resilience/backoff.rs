//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Upper bound on a single backoff delay, before jitter.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

fn capped_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 || base.is_zero() {
        return Duration::ZERO;
    }
    let factor = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(factor).min(max)
}

fn jitter_range_ms(delay: Duration) -> u64 {
    delay.as_millis() as u64 / 10
}

/// Delay before retry number `attempt` (1-based), capped at `max`.
///
/// Adds up to 10% jitter on top of the capped delay.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped = capped_delay(attempt, base, max);

    let jitter_range = jitter_range_ms(capped);
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}

/// Longest delay `calculate_backoff` can return for these arguments.
pub fn backoff_ceiling(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped = capped_delay(attempt, base, max);
    capped + Duration::from_millis(jitter_range_ms(capped))
}
