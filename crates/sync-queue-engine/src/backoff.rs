//! Per-operation backoff window.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Delay before an operation with `retry_count` failures may run again.
///
/// `base * 2^(retry_count - 1)`, capped at `max`; zero before the first
/// failure.
pub fn compute_backoff(retry_count: u32, base: Duration, max: Duration) -> chrono::Duration {
    if retry_count == 0 {
        return chrono::Duration::zero();
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let multiplier = 1u64.checked_shl(retry_count - 1).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);

    chrono::Duration::milliseconds(delay_ms as i64)
}

/// Whether an operation is outside its backoff window at `now`.
pub fn is_due(
    last_attempt_at: Option<DateTime<Utc>>,
    retry_count: u32,
    now: DateTime<Utc>,
    base: Duration,
    max: Duration,
) -> bool {
    let Some(last_attempt) = last_attempt_at else {
        return true;
    };
    now >= last_attempt + compute_backoff(retry_count, base, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(2);
    const MAX: Duration = Duration::from_secs(10);

    #[test]
    fn compute_backoff_caps_and_grows() {
        assert_eq!(compute_backoff(0, BASE, MAX), chrono::Duration::zero());
        assert_eq!(compute_backoff(1, BASE, MAX), chrono::Duration::seconds(2));
        assert_eq!(compute_backoff(2, BASE, MAX), chrono::Duration::seconds(4));
        assert_eq!(compute_backoff(3, BASE, MAX), chrono::Duration::seconds(8));
        assert_eq!(compute_backoff(4, BASE, MAX), chrono::Duration::seconds(10));
        assert_eq!(compute_backoff(u32::MAX, BASE, MAX), chrono::Duration::seconds(10));
    }

    #[test]
    fn is_due_respects_window() {
        let now = Utc::now();
        assert!(is_due(None, 0, now, BASE, MAX));
        assert!(is_due(Some(now), 0, now, BASE, MAX));
        assert!(!is_due(Some(now), 1, now, BASE, MAX));
        assert!(!is_due(
            Some(now),
            1,
            now + chrono::Duration::milliseconds(1999),
            BASE,
            MAX
        ));
        assert!(is_due(Some(now), 1, now + chrono::Duration::seconds(2), BASE, MAX));
    }

    #[test]
    fn zero_base_is_always_due() {
        let now = Utc::now();
        assert!(is_due(Some(now), 5, now, Duration::ZERO, MAX));
    }
}
