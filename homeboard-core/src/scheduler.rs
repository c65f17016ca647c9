//! Periodic background refresh.
//!
//! The loop sleeps one period, then forces a refresh, forever. Each refresh
//! runs in its own task so a panic inside a fetch is logged and the next tick
//! still happens. Cancellation is explicit and `stop` waits for the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, RefreshOutcome};
use crate::config::MAX_REFRESH_MINUTES;

/// Periods shorter than this are raised to it.
pub const MIN_REFRESH_MINUTES: u64 = 5;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RefreshScheduler {
    cache: Arc<CacheStore>,
    period: Duration,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// A scheduler refreshing every `refresh_minutes`, kept between
    /// [`MIN_REFRESH_MINUTES`] and [`MAX_REFRESH_MINUTES`].
    pub fn new(cache: Arc<CacheStore>, refresh_minutes: u64) -> Self {
        let minutes = refresh_minutes.clamp(MIN_REFRESH_MINUTES, MAX_REFRESH_MINUTES);
        Self::with_period(cache, Duration::from_secs(minutes * 60))
    }

    /// A scheduler with an exact period, with no lower bound.
    pub fn with_period(cache: Arc<CacheStore>, period: Duration) -> Self {
        RefreshScheduler {
            cache,
            period,
            cancellation: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the refresh loop. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("refresh scheduler already running");
            return false;
        }

        self.cancellation = CancellationToken::new();
        let cancel = self.cancellation.clone();
        let cache = self.cache.clone();
        let period = self.period;

        self.handle = Some(tokio::spawn(run_loop(cache, period, cancel)));
        info!(period_secs = period.as_secs(), "refresh scheduler started");
        true
    }

    /// Cancel the loop and wait briefly for it to exit.
    pub async fn stop(&mut self) {
        self.cancellation.cancel();

        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => info!("refresh scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "refresh scheduler task failed"),
            Err(_) => warn!("refresh scheduler did not stop in time"),
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn run_loop(cache: Arc<CacheStore>, period: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        let cache = cache.clone();
        match tokio::spawn(async move { cache.refresh(true).await }).await {
            Ok(RefreshOutcome::Refreshed { events }) => debug!(events, "scheduled refresh done"),
            Ok(outcome) => debug!(?outcome, "scheduled refresh skipped"),
            Err(e) => error!(error = %e, "scheduled refresh panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::clock::{Clock, ManualClock};
    use crate::config::HomeboardConfig;
    use chrono::{DateTime, TimeZone, Utc};

    fn cache_with_clock(dir: &std::path::Path, clock: Arc<dyn Clock>) -> Arc<CacheStore> {
        let config = HomeboardConfig {
            data_dir: dir.join("data"),
            cache_dir: dir.join("cache"),
            ..HomeboardConfig::default()
        };
        Arc::new(CacheStore::from_config(&config, clock).unwrap())
    }

    fn cache_in(dir: &std::path::Path) -> Arc<CacheStore> {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        cache_with_clock(dir, clock)
    }

    /// Panics the first time it is read, then behaves.
    struct PanicOnceClock {
        reads: AtomicUsize,
    }

    impl Clock for PanicOnceClock {
        fn now(&self) -> DateTime<Utc> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("clock unavailable");
            }
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        }
    }

    #[tokio::test]
    async fn test_period_has_a_floor() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = RefreshScheduler::new(cache_in(dir.path()), 1);
        assert_eq!(scheduler.period(), Duration::from_secs(300));

        let scheduler = RefreshScheduler::new(cache_in(dir.path()), 30);
        assert_eq!(scheduler.period(), Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn test_period_has_a_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = RefreshScheduler::new(cache_in(dir.path()), u64::MAX);
        assert_eq!(scheduler.period(), Duration::from_secs(MAX_REFRESH_MINUTES * 60));
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_ends_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut scheduler = RefreshScheduler::new(cache_in(dir.path()), 30);

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_each_period() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let mut updates = cache.subscribe();
        let mut scheduler = RefreshScheduler::with_period(cache.clone(), Duration::from_secs(60));
        scheduler.start();

        updates.changed().await.unwrap();
        assert!(cache.snapshot().last_refreshed_at().is_some());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_a_panicking_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(PanicOnceClock {
            reads: AtomicUsize::new(0),
        });
        let cache = cache_with_clock(dir.path(), clock.clone());
        let mut updates = cache.subscribe();
        let mut scheduler = RefreshScheduler::with_period(cache.clone(), Duration::from_secs(60));
        scheduler.start();

        // First tick panics inside refresh; the second one commits.
        updates.changed().await.unwrap();
        assert!(clock.reads.load(Ordering::SeqCst) >= 2);
        assert!(scheduler.is_running());
        assert!(cache.snapshot().last_refreshed_at().is_some());

        scheduler.stop().await;
    }
}
