// ── Paw Engine: Retry Backoff ──────────────────────────────────────────────
//
// Shared backoff utilities for transient provider failures.
//
//   • Exponential backoff with ±25% jitter, capped at 30s
//   • Jitter source is the system clock (no RNG crate needed)

use std::time::{Duration, SystemTime};

/// Maximum retry delay cap in milliseconds (30 seconds).
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Backoff for 0-based `attempt` starting from `base_ms`, before jitter.
pub fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.min(16))).min(MAX_RETRY_DELAY_MS)
}

/// Sleep with exponential backoff + ±25% jitter.
/// Returns the actual delay duration for logging.
pub async fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let delay = Duration::from_millis(apply_jitter(backoff_ms(base_ms, attempt)));
    tokio::time::sleep(delay).await;
    delay
}

/// Apply ±25% jitter to prevent thundering-herd effects.
fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms;
    }
    (base_ms as i64 + jitter_offset(rand_jitter(), jitter_range)).max(0) as u64
}

/// Map a raw sample onto `-range..=range`.
fn jitter_offset(sample: u64, range: i64) -> i64 {
    (sample % (2 * range as u64 + 1)) as i64 - range
}

/// Jitter source: sub-second nanos of the system clock (0..10^9).
fn rand_jitter() -> u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().subsec_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_ms(500, 0), 500);
        assert_eq!(backoff_ms(500, 1), 1_000);
        assert_eq!(backoff_ms(500, 3), 4_000);
        assert_eq!(backoff_ms(500, 20), MAX_RETRY_DELAY_MS);
    }

    #[test]
    fn jitter_stays_within_quarter() {
        for _ in 0..50 {
            let j = apply_jitter(1_000);
            assert!((750..=1_250).contains(&j), "jitter {j} out of range");
        }
        assert_eq!(apply_jitter(0), 0);
    }

    #[test]
    fn jitter_offset_spans_both_sides_of_long_delays() {
        // 8s delay: ±2000ms
        let range = 2_000;
        assert_eq!(jitter_offset(0, range), -2_000);
        assert_eq!(jitter_offset(2_000, range), 0);
        assert_eq!(jitter_offset(4_000, range), 2_000);
        assert_eq!(jitter_offset(4_001, range), -2_000);
        assert!(jitter_offset(999_999_999, range) >= -range);
        assert!((1_500..4_001).any(|s| jitter_offset(s, range) > 500));
    }
}
