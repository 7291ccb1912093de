//! Background eviction of expired guard windows

use crate::guard::MisuseGuard;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Background worker that sweeps the guard's windows on a schedule
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use thirdeye_gatekeeper::{GuardConfig, GuardWorker, MemorySink, MisuseGuard};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let guard = Arc::new(MisuseGuard::new(GuardConfig::default(), Arc::new(MemorySink::new()))?);
///     let worker = GuardWorker::new(Arc::clone(&guard));
///
///     // Runs until Ctrl+C or guard.clear()
///     worker.run(async { tokio::signal::ctrl_c().await.ok(); }).await;
///     Ok(())
/// }
/// ```
pub struct GuardWorker {
    guard: Arc<MisuseGuard>,
    interval: Duration,
}

impl GuardWorker {
    /// Create a worker using the guard's sweep interval
    pub fn new(guard: Arc<MisuseGuard>) -> Self {
        let interval = guard.config().sweep_interval();
        Self { guard, interval }
    }

    fn sweep_once(&self) -> usize {
        match self.guard.sweep() {
            Ok(evicted) => {
                tracing::debug!("Guard sweep evicted {} window entries", evicted);
                evicted
            }
            Err(e) => {
                tracing::error!("Guard sweep failed: {}", e);
                0
            }
        }
    }

    /// Sweep until `shutdown` completes or the guard is cleared
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        let mut stop = self.guard.stop_signal();
        tokio::pin!(shutdown);

        tracing::info!("Guard worker started (interval: {:?})", self.interval);

        let mut total = 0;
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    total += self.sweep_once();
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping guard worker");
                    break;
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Guard worker stopped after evicting {} entries", total);
    }

    /// Run a fixed number of sweeps, returning entries evicted
    pub async fn run_cycles(&self, cycles: usize) -> usize {
        let mut ticker = interval(self.interval);
        let mut total = 0;
        for _ in 0..cycles {
            ticker.tick().await;
            total += self.sweep_once();
        }
        total
    }
}
