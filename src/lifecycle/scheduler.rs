//! Periodic lifecycle evaluation

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use super::coordinator::EventLifecycleCoordinator;

/// Runs [`EventLifecycleCoordinator::tick`] on a fixed period until shut down
pub struct LifecycleScheduler;

impl LifecycleScheduler {
    /// Spawn the polling task. The first tick runs immediately.
    pub fn spawn(coordinator: Arc<EventLifecycleCoordinator>, period: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "Lifecycle scheduler started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.tick().await {
                            error!(error = %e, "Lifecycle tick failed");
                        }
                    }
                }
            }

            info!("Lifecycle scheduler stopped");
        });

        SchedulerHandle { shutdown: Some(shutdown_tx), task: Some(task) }
    }
}

pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop after the tick in progress, if any, completes
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Lifecycle scheduler task panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
