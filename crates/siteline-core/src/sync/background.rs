//! Periodic and connectivity-driven sync scheduling.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connectivity::{ConnectionState, ConnectivityMonitor};

use super::SyncService;

/// Handle to the background sync loop.
///
/// The loop fires an attempt immediately at spawn, then every `period`,
/// and additionally whenever connectivity flips back to online. All
/// attempts are automatic (`force = false`) so the service throttle keeps
/// the timer and connectivity paths from stacking up. Dropping the handle
/// stops the loop at its next wakeup.
pub struct BackgroundSync {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundSync {
    /// Spawn the scheduling loop. The caller is responsible for starting
    /// the monitor's probe loop; this only subscribes to its transitions.
    #[must_use]
    pub fn spawn(service: SyncService, monitor: &ConnectivityMonitor, period: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let mut connectivity = monitor.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        attempt(&service).await;
                    }
                    changed = connectivity.changed() => {
                        let Ok(()) = changed else { break };
                        let online =
                            *connectivity.borrow_and_update() == ConnectionState::Online;
                        if online {
                            tracing::debug!("Connectivity regained; attempting sync");
                            attempt(&service).await;
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Stop the loop and wait for it to finish. A cycle already underway
    /// runs to completion first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

async fn attempt(service: &SyncService) {
    match service.sync_all(false).await {
        Ok(_) => {}
        Err(error) if error.is_transient() => {
            tracing::debug!(%error, "Sync attempt skipped");
        }
        Err(error) => {
            tracing::warn!(%error, "Sync attempt failed");
        }
    }
}
