//! Fleet state synchronizer.
//!
//! Keeps the profile list consistent across optimistic user actions, pushed
//! lifecycle events and polled metrics, and computes the visible window of
//! the (possibly very long) list. All mutation happens on the caller's task;
//! background work only posts [`FleetEvent`]s into the view's inbox.

pub mod controller;
pub mod ingest;
pub mod poller;
pub mod selection;
pub mod sort;
pub mod state;
pub mod window;

use tokio::sync::mpsc;

use crate::host::{HostError, LifecycleEvent, SyncStatusEvent};
use crate::models::{MetricSnapshot, ProfileId, ProfileRecord};

pub use controller::{DispatchOutcome, FleetAction, FleetOptions, FleetRow, FleetView, NoticeLevel};
pub use sort::{Partition, SortColumn, SortSpec};
pub use state::LifecyclePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Launch,
    Stop,
}

impl CommandKind {
    pub fn verb(self) -> &'static str {
        match self {
            CommandKind::Launch => "launch",
            CommandKind::Stop => "stop",
        }
    }
}

/// Completion of some asynchronous work, delivered to the fleet view.
#[derive(Debug)]
pub enum FleetEvent {
    Records(Result<Vec<ProfileRecord>, HostError>),
    /// Running-set at mount time.
    RunningSeed(Result<Vec<ProfileId>, HostError>),
    Lifecycle(LifecycleEvent),
    SyncStatus(SyncStatusEvent),
    SubscriptionFailed { channel: &'static str },
    Metrics(Result<Vec<MetricSnapshot>, HostError>),
    CommandFinished {
        kind: CommandKind,
        id: ProfileId,
        result: Result<(), HostError>,
    },
    UploadFinished {
        id: ProfileId,
        result: Result<String, HostError>,
    },
    GroupAssigned {
        count: usize,
        group: Option<String>,
        result: Result<(), HostError>,
    },
}

pub type Inbox = mpsc::UnboundedSender<FleetEvent>;
