//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped at `max`.
///
/// `jitter_ratio` adds up to that fraction of the delay on top; 0.0 keeps the
/// doubling exact.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, jitter_ratio: f64) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    let capped = base.saturating_mul(factor).min(max);

    if jitter_ratio <= 0.0 {
        return capped;
    }

    let jitter_range = (capped.as_millis() as f64 * jitter_ratio) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_secs(2);

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(calculate_backoff(0, BASE, MAX, 0.0), Duration::from_millis(100));
        assert_eq!(calculate_backoff(1, BASE, MAX, 0.0), Duration::from_millis(200));
        assert_eq!(calculate_backoff(2, BASE, MAX, 0.0), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped() {
        assert_eq!(calculate_backoff(10, BASE, MAX, 0.0), MAX);
        // Huge exponents saturate instead of overflowing.
        assert_eq!(calculate_backoff(64, BASE, MAX, 0.0), MAX);
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        for _ in 0..50 {
            let d = calculate_backoff(1, BASE, MAX, 0.5);
            assert!(d >= Duration::from_millis(200));
            assert!(d < Duration::from_millis(300));
        }
    }
}
