//! Periodic expiration sweep scheduler
//!
//! Owns the background task performing eager bulk expiration. Each tick
//! awaits the sweep before the next one can fire, so ticks never overlap;
//! a failed tick is logged and the schedule continues.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::domain::SubscriptionRepository;

use super::service::SubscriptionService;

/// Cancelable handle to the recurring sweep task.
///
/// Started once at process startup, aborted at shutdown. The schedule is
/// an in-memory timer only; it resets on restart.
#[derive(Debug, Default)]
pub struct SweepScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SweepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the recurring sweep with the given period.
    ///
    /// Replaces any previously started task. The first sweep runs one full
    /// period after startup, not immediately.
    pub async fn start<R>(&self, service: Arc<SubscriptionService<R>>, period: Duration)
    where
        R: SubscriptionRepository + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately on the first tick; skip it
            ticker.tick().await;

            loop {
                ticker.tick().await;

                // Errors are swallowed: a failed tick must not take down
                // the scheduler, and the next tick proceeds on schedule
                if let Err(e) = service.sweep_expired().await {
                    warn!(error = %e, "Expiration sweep tick failed");
                }
            }
        });

        let mut slot = self.handle.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }

        info!(period_secs = period.as_secs(), "Expiration sweep scheduler started");
    }

    /// Cancel the recurring sweep, if running
    pub async fn shutdown(&self) {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
            info!("Expiration sweep scheduler stopped");
        }
    }

    /// Whether a sweep task is currently scheduled
    pub async fn is_running(&self) -> bool {
        let slot = self.handle.lock().await;
        slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}
