//! Backoff delays between retry attempts.

use std::time::Duration;

use rand::Rng;

/// Maximum jitter added to each delay (250ms).
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Linearly-increasing delay policy.
///
/// The pause before retry `n` is `min(base_delay * n, max_delay)` plus a
/// small random jitter so repeated failures do not land on the target at a
/// fixed cadence.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Creates a policy from the base and cap delays.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay to await before the given retry (1-indexed: the pause before
    /// the second attempt is `delay_for(1)`).
    #[must_use]
    pub fn delay_for(&self, completed_attempts: u32) -> Duration {
        let scaled = self
            .base_delay
            .saturating_mul(completed_attempts.max(1))
            .min(self.max_delay);
        scaled + self.jitter()
    }

    fn jitter(&self) -> Duration {
        // No jitter when backoff is disabled entirely (test configs).
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=MAX_JITTER.as_millis() as u64))
    }
}
