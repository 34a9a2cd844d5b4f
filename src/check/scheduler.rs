use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::{self, JoinHandle},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, Instrument};

use super::ServiceCheck;

const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

impl ServiceCheck {
    /// Evaluate dependencies every `interval`, forever.
    ///
    /// The loop has no way to stop other than aborting the returned handle
    /// or tearing the runtime down. Use [`ServiceCheck::start_until`] for a
    /// graceful stop.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        self.start_until(CancellationToken::new())
    }

    /// Same as [`ServiceCheck::start`], but the loop ends once `shutdown`
    /// is cancelled.
    pub fn start_until(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.clone().run_periodic(shutdown))
    }

    #[instrument(skip_all, fields(service = %self.name()))]
    async fn run_periodic(self: Arc<Self>, shutdown: CancellationToken) {
        debug!("Health check started, every {:?}", self.interval());
        loop {
            self.evaluate().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval()) => (),
            }
        }
        debug!("Health check stopped");
    }

    /// Wait until the service is healthy, re-evaluating every second.
    ///
    /// Returns `true` once a completed cycle finds the service healthy and
    /// `false` if `timeout` elapses first. Cycles aborted by a panicking
    /// probe don't count. The polling task outlives a timed-out wait and
    /// keeps going until it sees the service healthy.
    pub async fn wait_for_healthy(self: &Arc<Self>, timeout_after: Duration) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        let check = self.clone();
        let span = tracing::info_span!("wait_for_healthy", service = %self.name());
        tokio::spawn(
            async move {
                loop {
                    if check.evaluate().await == Some(true) {
                        debug!("Service is healthy, stop waiting");
                        // Waiter may have timed out already
                        let _ = done_tx.send(());
                        break;
                    }
                    sleep(WAIT_POLL_INTERVAL).await;
                }
            }
            .instrument(span),
        );
        match timeout(timeout_after, done_rx).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                info!(
                    "Service [{}] still unhealthy after {:?}",
                    self.name(),
                    timeout_after
                );
                false
            }
        }
    }

    /// Run one cycle on the blocking pool. A panicking probe aborts only
    /// this cycle.
    async fn evaluate(self: &Arc<Self>) -> Option<bool> {
        let check = self.clone();
        match task::spawn_blocking(move || check.update_status()).await {
            Ok(healthy) => {
                debug!("Evaluated, healthy: {}", healthy);
                Some(healthy)
            }
            Err(err) => {
                error!("Health evaluation aborted: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Instant,
    };

    use super::*;
    use crate::Level;

    fn new_check(interval: Duration) -> Arc<ServiceCheck> {
        Arc::new(ServiceCheck::new("test", interval).unwrap())
    }

    #[tokio::test]
    async fn hard_failure_within_one_interval() {
        let check = new_check(Duration::from_millis(50));
        check.register("db", Level::Hard, || false).unwrap();
        assert!(check.is_healthy());
        check.start();
        sleep(Duration::from_millis(100)).await;
        assert!(!check.is_healthy());
        assert_eq!(check.http_status_code(), 503);
    }

    #[tokio::test]
    async fn soft_failure_stays_healthy() {
        let check = new_check(Duration::from_millis(20));
        check.register("cache", Level::Soft, || false).unwrap();
        check.start();
        for _ in 0..5 {
            sleep(Duration::from_millis(20)).await;
            assert!(check.is_healthy());
        }
        assert!(!check.dependency("cache").unwrap().healthy);
    }

    #[tokio::test]
    async fn periodic_loop_repeats() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let check = new_check(Duration::from_millis(10));
        check
            .register("db", Level::Hard, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .unwrap();
        check.start();
        sleep(Duration::from_millis(200)).await;
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn stop_on_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let check = new_check(Duration::from_millis(10));
        check
            .register("db", Level::Soft, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .unwrap();
        let shutdown = CancellationToken::new();
        let handle = check.start_until(shutdown.clone());
        sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle.await.unwrap();
        let stopped_at = calls.load(Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test]
    async fn survive_panicking_probe() {
        let explode = Arc::new(AtomicBool::new(false));
        let probe_explode = explode.clone();
        let check = new_check(Duration::from_millis(10));
        check
            .register("flaky", Level::Hard, move || {
                if probe_explode.load(Ordering::SeqCst) {
                    panic!("probe exploded");
                }
                false
            })
            .unwrap();
        explode.store(true, Ordering::SeqCst);
        assert_eq!(check.evaluate().await, None);
        explode.store(false, Ordering::SeqCst);
        assert_eq!(check.evaluate().await, Some(false));
    }

    #[tokio::test]
    async fn wait_for_healthy_dependency() {
        let check = new_check(Duration::from_secs(60));
        check.register("db", Level::Hard, || true).unwrap();
        let t0 = Instant::now();
        assert!(check.wait_for_healthy(Duration::from_secs(2)).await);
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn wait_for_late_recovery() {
        let up = Arc::new(AtomicBool::new(false));
        let probe_up = up.clone();
        let check = new_check(Duration::from_secs(60));
        check
            .register("db", Level::Hard, move || probe_up.load(Ordering::SeqCst))
            .unwrap();
        let flip = up.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            flip.store(true, Ordering::SeqCst);
        });
        assert!(check.wait_for_healthy(Duration::from_secs(3)).await);
    }

    #[tokio::test]
    async fn wait_times_out() {
        let check = new_check(Duration::from_secs(60));
        check.register("db", Level::Hard, || false).unwrap();
        let t0 = Instant::now();
        assert!(!check.wait_for_healthy(Duration::from_secs(2)).await);
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn aborted_cycles_are_not_healthy() {
        let seeded = Arc::new(AtomicBool::new(false));
        let seen = seeded.clone();
        let check = new_check(Duration::from_secs(60));
        check
            .register("flaky", Level::Hard, move || {
                if seen.swap(true, Ordering::SeqCst) {
                    panic!("check exploded");
                }
                false
            })
            .unwrap();
        let t0 = Instant::now();
        assert!(!check.wait_for_healthy(Duration::from_secs(2)).await);
        assert!(t0.elapsed() >= Duration::from_secs(2));
        assert!(!check.dependency("flaky").unwrap().healthy);
    }
}
