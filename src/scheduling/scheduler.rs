use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::sync::SyncOrchestrator;

/// Drives the time-based triggers: an optional delayed startup sync and the
/// fixed-interval background sync. All actual work happens inside the
/// orchestrator's single-flight guard, so timer ticks can never overlap a
/// running pass.
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    sync_on_startup: bool,
    startup_delay: Duration,
    interval_minutes: u64,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, config: &Config) -> Self {
        let cancel = orchestrator.cancellation_token();

        Self {
            orchestrator,
            sync_on_startup: config.sync_on_startup,
            startup_delay: Duration::from_secs(config.startup_delay_seconds),
            interval_minutes: config.sync_interval_minutes,
            cancel,
        }
    }

    pub async fn run(self) {
        if self.sync_on_startup {
            info!(
                "Startup sync scheduled in {} seconds",
                self.startup_delay.as_secs()
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = sleep(self.startup_delay) => {}
            }

            debug!("Startup timer fired");
            self.orchestrator.sync_now().await;
        }

        if self.interval_minutes == 0 {
            debug!("Interval sync disabled");
            return;
        }

        info!(
            "Background sync scheduled every {} minutes",
            self.interval_minutes
        );

        let mut ticker = interval(Duration::from_secs(self.interval_minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately; the
        // startup timer already covers "sync right away".
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Background sync scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    debug!("Interval timer fired");
                    self.orchestrator.sync_now().await;
                }
            }
        }
    }
}
