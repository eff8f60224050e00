//! External collaborators of the fleet core.
//!
//! The process registry, the lifecycle/sync event channels and the metrics
//! source are owned by the host process. The fleet core reaches them only
//! through these traits; every call is asynchronous and may fail.

pub mod local;

#[cfg(test)]
pub mod fake;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::{MetricSnapshot, ProfileId, ProfileRecord};

pub use local::LocalHost;

/// Failure of a host call.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host unavailable: {0}")]
    Unavailable(String),

    #[error("profile not found: {0}")]
    NotFound(ProfileId),

    #[error("{id}: {reason}")]
    Rejected { id: ProfileId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Pushed notification: the host saw a profile's browser start or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: ProfileId,
    pub is_running: bool,
}

impl LifecycleEvent {
    pub fn new(id: impl Into<ProfileId>, is_running: bool) -> Self {
        Self {
            id: id.into(),
            is_running,
        }
    }
}

/// Pushed notification: free-form remote sync status token for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusEvent {
    pub id: ProfileId,
    pub status: String,
}

impl SyncStatusEvent {
    pub fn new(id: impl Into<ProfileId>, status: &str) -> Self {
        Self {
            id: id.into(),
            status: status.to_string(),
        }
    }
}

/// Live subscription handle. Dropping it (or calling [`Subscription::unsubscribe`])
/// detaches from the channel.
pub struct Subscription<T> {
    channel: &'static str,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(channel: &'static str, rx: broadcast::Receiver<T>) -> Self {
        Self { channel, rx }
    }

    /// Next delivered item, or `None` once the host closes the channel.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = self.channel, skipped, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Authoritative list of profiles plus the commands acting on them.
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    async fn list_processes(&self) -> Result<Vec<ProfileRecord>, HostError>;

    /// Profiles whose browser is running right now. Used once at mount to
    /// seed the running-set before push events take over.
    async fn running_ids(&self) -> Result<Vec<ProfileId>, HostError>;

    /// Resolves once the host accepted the launch. The running state itself
    /// arrives later as a [`LifecycleEvent`].
    async fn launch_process(&self, id: &ProfileId) -> Result<(), HostError>;

    async fn stop_process(&self, id: &ProfileId) -> Result<(), HostError>;

    /// Push the profile to the remote directory; returns the remote URL.
    async fn upload_profile(&self, id: &ProfileId) -> Result<String, HostError>;

    async fn assign_group(
        &self,
        ids: &[ProfileId],
        group: Option<String>,
    ) -> Result<(), HostError>;
}

#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn subscribe_lifecycle(&self) -> Result<Subscription<LifecycleEvent>, HostError>;

    async fn subscribe_sync_status(&self) -> Result<Subscription<SyncStatusEvent>, HostError>;
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Latest snapshot for every profile the host has telemetry for.
    async fn fetch_all_metrics(&self) -> Result<Vec<MetricSnapshot>, HostError>;
}

/// Answers "is a host-wide update of this browser kind in progress?".
pub trait UpdateLocks: Send + Sync {
    fn is_updating(&self, browser: &str) -> bool;
}

impl UpdateLocks for HashSet<String> {
    fn is_updating(&self, browser: &str) -> bool {
        self.contains(browser)
    }
}

/// Everything the fleet view needs from its host.
pub trait Host: ProcessRegistry + EventChannel + MetricsSource + UpdateLocks {}

impl<T> Host for T where T: ProcessRegistry + EventChannel + MetricsSource + UpdateLocks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_error_names_profile() {
        let err = HostError::Rejected {
            id: ProfileId::from("p1"),
            reason: "already running".to_string(),
        };
        assert_eq!(err.to_string(), "p1: already running");
    }

    #[test]
    fn update_locks_for_set() {
        let mut set = HashSet::new();
        set.insert("wayfern".to_string());
        assert!(set.is_updating("wayfern"));
        assert!(!set.is_updating("camoufox"));
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(4);
        let mut sub = Subscription::new("test", rx);
        tx.send(LifecycleEvent::new("a", true)).unwrap();
        drop(tx);
        assert_eq!(sub.recv().await, Some(LifecycleEvent::new("a", true)));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn subscription_skips_lagged_items() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = Subscription::new("test", rx);
        for i in 0..4 {
            tx.send(SyncStatusEvent::new("a", &format!("s{i}"))).unwrap();
        }
        // Oldest two were overwritten; the next receive yields the oldest survivor.
        assert_eq!(sub.recv().await.map(|e| e.status), Some("s2".to_string()));
    }
}
