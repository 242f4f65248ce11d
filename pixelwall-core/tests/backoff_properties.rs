//! Property tests for fetch retry backoff.

use pixelwall_core::fetch::{
    backoff_delay_ms, DataSource, FetchError, FetchScheduler, BACKOFF_BASE_MS, MAX_RETRY,
};
use proptest::prelude::*;

/// Source that fails until told otherwise
struct Flaky {
    healthy: bool,
}

impl DataSource for Flaky {
    type Output = ();
    const DEFAULT_INTERVAL_MINUTES: u16 = 30;

    fn name(&self) -> &'static str {
        "flaky"
    }

    fn fetch(&mut self) -> Result<(), FetchError> {
        if self.healthy {
            Ok(())
        } else {
            Err(FetchError::Transport)
        }
    }
}

#[test]
fn backoff_sequence_doubles_then_saturates() {
    let mut scheduler = FetchScheduler::new(Flaky { healthy: false });
    let mut now = 0;
    let mut counts = Vec::new();
    let mut deltas = Vec::new();

    for _ in 0..6 {
        let _ = scheduler.fetch_now(now);
        let next = scheduler.next_retry_at().unwrap();
        counts.push(scheduler.retry_count());
        deltas.push((next - now) / BACKOFF_BASE_MS);
        now = next;
    }

    assert_eq!(counts, [1, 2, 3, 4, 4, 4]);
    assert_eq!(deltas, [1, 2, 4, 8, 8, 8]);
}

proptest! {
    /// The retry counter never exceeds its ceiling and the delay never
    /// exceeds the delay at the ceiling
    #[test]
    fn retry_state_is_bounded(failures in 1usize..40, start in 0u64..1_000_000_000) {
        let mut scheduler = FetchScheduler::new(Flaky { healthy: false });
        let mut now = start;
        for _ in 0..failures {
            let _ = scheduler.fetch_now(now);
            let next = scheduler.next_retry_at().unwrap();
            prop_assert!(scheduler.retry_count() <= MAX_RETRY);
            prop_assert!(next - now <= backoff_delay_ms(MAX_RETRY));
            prop_assert!(next > now);
            now = next;
        }
    }

    /// Nothing is attempted before the retry deadline, and a success at the
    /// deadline clears the backoff
    #[test]
    fn success_clears_backoff(failures in 1usize..10, early in 1u64..60_000) {
        let mut scheduler = FetchScheduler::new(Flaky { healthy: false });
        let mut now = 0;
        for _ in 0..failures {
            let _ = scheduler.fetch_now(now);
            now = scheduler.next_retry_at().unwrap();
        }

        prop_assert_eq!(scheduler.maybe_fetch(now - early), None);

        scheduler.source_mut().healthy = true;
        prop_assert_eq!(scheduler.maybe_fetch(now), Some(Ok(())));
        prop_assert_eq!(scheduler.retry_count(), 0);
        prop_assert_eq!(scheduler.next_retry_at(), None);
        prop_assert!(scheduler.is_valid());
    }

    /// Delays are monotonic in the retry count
    #[test]
    fn delays_are_monotonic(count in 0u8..=u8::MAX) {
        prop_assert!(backoff_delay_ms(count) <= backoff_delay_ms(count.saturating_add(1)));
        prop_assert!(backoff_delay_ms(count) >= BACKOFF_BASE_MS);
    }
}
