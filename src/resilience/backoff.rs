//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Delay before retry number `attempt` (1-based; 0 means no delay).
pub fn calculate_backoff(attempt: u32, policy: &RetryConfig) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = policy
        .base_delay_ms
        .saturating_mul(factor)
        .min(policy.max_delay_ms);

    // Up to 10% jitter on top.
    let spread = capped / 10;
    let jitter = if spread > 0 {
        rand::thread_rng().gen_range(0..spread)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
