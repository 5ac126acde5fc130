//! Timer loop around [`CycleDriver::run_cycle`].
//!
//! The first cycle starts immediately. Each cycle is awaited inside the loop,
//! so a slow cycle delays the next tick instead of overlapping it, and missed
//! ticks are skipped rather than replayed. Shutdown is only observed between
//! cycles; a cycle that has started always runs to completion.

use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::cycle::CycleDriver;
use crate::store::SeenStore;

/// Runs cycles every `period` until `shutdown` resolves. Returns the number
/// of cycles completed.
pub async fn run<F>(
    driver: &CycleDriver,
    store: &mut SeenStore,
    period: Duration,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!(cycles, "Scheduler stopped");
                break;
            }
            _ = timer.tick() => {
                driver.run_cycle(store, Utc::now()).await;
                cycles += 1;
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentTransformer, TransformError, Verdict};
    use crate::cycle::CycleSettings;
    use crate::feed::{FeedEntry, FeedSource, FetchError};
    use crate::publish::{PublishError, Publisher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for CountingSource {
        async fn fetch(&self, _url: &str) -> Result<Vec<FeedEntry>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct Unused;

    #[async_trait]
    impl ContentTransformer for Unused {
        async fn transform(&self, _: &str, _: &str, _: &str) -> Result<String, TransformError> {
            unreachable!("no entries are produced")
        }
        async fn validate(&self, _: &str, _: &str, _: &str) -> Result<Verdict, TransformError> {
            unreachable!("no entries are produced")
        }
    }

    #[async_trait]
    impl Publisher for Unused {
        async fn send_chunk(&self, _: &str) -> Result<(), PublishError> {
            unreachable!("no entries are produced")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_period() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SeenStore::load(dir.path().join("state.json"));
        let source = Arc::new(CountingSource::default());
        let driver = CycleDriver::new(
            vec!["https://example.com/feed".into()],
            source.clone(),
            Arc::new(Unused),
            Arc::new(Unused),
            CycleSettings::default(),
        );

        let period = Duration::from_secs(60 * 60);
        let shutdown = tokio::time::sleep(period * 2 + Duration::from_secs(1));
        let cycles = run(&driver, &mut store, period, shutdown).await;

        // Ticks at 0, 60 and 120 minutes of paused time
        assert_eq!(cycles, 3);
        // Wall-clock time barely moved, so the per-feed throttle kept the
        // later cycles from fetching again
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(store.last_check("https://example.com/feed").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SeenStore::load(dir.path().join("state.json"));
        let driver = CycleDriver::new(
            Vec::new(),
            Arc::new(CountingSource::default()),
            Arc::new(Unused),
            Arc::new(Unused),
            CycleSettings::default(),
        );

        let cycles = run(&driver, &mut store, Duration::from_secs(60), async {}).await;
        assert_eq!(cycles, 0);
    }
}
