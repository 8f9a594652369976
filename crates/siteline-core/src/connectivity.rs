//! Connectivity observation via a periodic health probe.
//!
//! There is no OS-level network event source here; the monitor polls the
//! server's health endpoint on a fixed period and publishes transitions
//! over a watch channel. Dependents either snapshot `is_online()` or
//! subscribe and react to changes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SyncSettings;
use crate::error::Result;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Last observed reachability of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Online,
    Offline,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

struct Inner {
    health_url: String,
    client: Client,
    sender: watch::Sender<ConnectionState>,
}

/// Watches server reachability; cheap to clone.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Build a monitor for the configured server. Starts out `Offline`
    /// until the first probe says otherwise.
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        let (sender, _) = watch::channel(ConnectionState::Offline);

        Ok(Self {
            inner: Arc::new(Inner {
                health_url: settings.health_url(),
                client,
                sender,
            }),
        })
    }

    /// Snapshot of the last known state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Online
    }

    /// Last known state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.sender.borrow()
    }

    /// Receiver that yields on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.sender.subscribe()
    }

    /// Probe the health endpoint once and record the result.
    pub async fn probe_now(&self) -> ConnectionState {
        let state = match self.inner.client.get(&self.inner.health_url).send().await {
            Ok(response) if response.status().is_success() => ConnectionState::Online,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Health probe rejected");
                ConnectionState::Offline
            }
            Err(error) => {
                tracing::debug!(%error, "Health probe failed");
                ConnectionState::Offline
            }
        };

        self.set_state(state);
        state
    }

    /// Spawn the periodic probe loop. Abort the handle to stop probing.
    pub fn start(&self, period: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.probe_now().await;
            }
        })
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = self.inner.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            tracing::info!(state = state.as_str(), "Connectivity changed");
        }
    }

    #[cfg(test)]
    pub(crate) fn set_state_for_tests(&self, state: ConnectionState) {
        self.set_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn monitor() -> ConnectivityMonitor {
        ConnectivityMonitor::new(&SyncSettings::new("https://api.example.com", "acct_1")).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_starts_offline_and_broadcasts_transitions() {
        let monitor = monitor();
        assert_eq!(monitor.state(), ConnectionState::Offline);
        assert!(!monitor.is_online());

        let mut receiver = monitor.subscribe();
        monitor.set_state_for_tests(ConnectionState::Online);

        assert!(receiver.has_changed().unwrap());
        receiver.mark_unchanged();
        assert!(monitor.is_online());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_repeated_state_does_not_notify() {
        let monitor = monitor();
        monitor.set_state_for_tests(ConnectionState::Online);

        let mut receiver = monitor.subscribe();
        monitor.set_state_for_tests(ConnectionState::Online);
        assert!(!receiver.has_changed().unwrap());

        monitor.set_state_for_tests(ConnectionState::Offline);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), ConnectionState::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_probe_unreachable_host_reports_offline() {
        // Reserved TEST-NET address, nothing listens there
        let settings = SyncSettings::new("http://192.0.2.1:9", "acct_1");
        let monitor = ConnectivityMonitor::new(&settings).unwrap();
        monitor.set_state_for_tests(ConnectionState::Online);

        assert_eq!(monitor.probe_now().await, ConnectionState::Offline);
        assert!(!monitor.is_online());
    }
}
