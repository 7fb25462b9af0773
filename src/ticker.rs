//! Periodic Task Scheduler
//!
//! Shared tick loop for all background sweepers: wakes on a fixed
//! interval or on cancellation, whichever comes first. Missed ticks are
//! skipped, never queued, and the handler runs to completion before the
//! next tick is observed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a task running `tick_fn` every `period` until cancellation
pub(crate) fn spawn_periodic<F>(
    period: Duration,
    shutdown: CancellationToken,
    mut tick_fn: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick of a tokio interval completes immediately;
        // consume it so the first run lands one full period after start.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("periodic task cancelled");
                    break;
                }
                _ = ticker.tick() => tick_fn(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_ticks_until_cancelled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let ticks = Arc::clone(&counter);
        let handle = spawn_periodic(Duration::from_millis(20), token.clone(), move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(110)).await;
        token.cancel();
        assert_ok!(handle.await);

        let observed = counter.load(Ordering::SeqCst);
        assert!(observed >= 3, "expected at least 3 ticks, got {observed}");

        // No further ticks after cancellation.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), observed);
    }

    #[tokio::test]
    async fn test_no_tick_before_first_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let ticks = Arc::clone(&counter);
        let handle = spawn_periodic(Duration::from_secs(60), token.clone(), move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        token.cancel();
        handle.await.unwrap();
    }
}
