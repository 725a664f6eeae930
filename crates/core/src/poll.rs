//! Bounded retry-with-sleep used to wait out a venue's eventual
//! consistency window.

use std::future::Future;
use std::time::Duration;

/// A bounded polling loop: probe, sleep, repeat, up to a fixed number of
/// attempts. This is a blocking wait on an external venue, not a
/// concurrency primitive; there is no cancellation hook.
#[derive(Debug, Clone, Copy)]
pub struct BoundedPoll {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl BoundedPoll {
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// The close-confirmation window: 10 attempts, 1 second apart.
    #[must_use]
    pub const fn close_confirmation() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Polls `probe` until it reports true or attempts run out. Returns
    /// whether the condition was observed; on timeout the caller proceeds
    /// regardless, assuming the venue will settle eventually.
    pub async fn wait_until<F, Fut>(&self, mut probe: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 0..self.max_attempts {
            if probe().await {
                return true;
            }
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        false
    }
}
