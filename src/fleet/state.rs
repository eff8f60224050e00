//! Per-profile transient state: lifecycle phase, busy flags, sync status.
//!
//! Two producers write here: local optimistic actions (`begin_*`, `rollback_*`)
//! and pushed lifecycle events (`on_lifecycle_event`). The phase shown for a
//! profile is derived from set membership, never stored on its own.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::host::UpdateLocks;
use crate::models::{ProfileId, ProfileRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Idle,
    Launching,
    Running,
    Stopping,
}

impl LifecyclePhase {
    /// Launching and stopping are waiting on host confirmation.
    pub fn is_transient(self) -> bool {
        matches!(self, LifecyclePhase::Launching | LifecyclePhase::Stopping)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Idle => write!(f, "Idle"),
            LifecyclePhase::Launching => write!(f, "Launching"),
            LifecyclePhase::Running => write!(f, "Running"),
            LifecyclePhase::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Number of profiles in each phase, over a record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub idle: usize,
    pub launching: usize,
    pub running: usize,
    pub stopping: usize,
}

#[derive(Debug, Default)]
pub struct FleetState {
    launching: HashSet<ProfileId>,
    stopping: HashSet<ProfileId>,
    running: HashSet<ProfileId>,
    uploading: HashSet<ProfileId>,
    sync_status: HashMap<ProfileId, String>,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launching wins over stopping, stopping over running, so optimistic
    /// intent stays visible until the host's confirmation clears it.
    pub fn phase(&self, id: &ProfileId) -> LifecyclePhase {
        if self.launching.contains(id) {
            LifecyclePhase::Launching
        } else if self.stopping.contains(id) {
            LifecyclePhase::Stopping
        } else if self.running.contains(id) {
            LifecyclePhase::Running
        } else {
            LifecyclePhase::Idle
        }
    }

    /// Optimistically mark a launch. Ignored (returns false) unless the
    /// profile is idle and its browser kind is not locked by an update.
    pub fn begin_launch<L>(&mut self, record: &ProfileRecord, locks: &L) -> bool
    where
        L: UpdateLocks + ?Sized,
    {
        if self.phase(&record.id) != LifecyclePhase::Idle || locks.is_updating(&record.browser) {
            return false;
        }
        self.launching.insert(record.id.clone())
    }

    /// Optimistically mark a stop. Requires the profile to be running with
    /// no other transition pending.
    pub fn begin_stop(&mut self, id: &ProfileId) -> bool {
        if self.phase(id) != LifecyclePhase::Running {
            return false;
        }
        self.stopping.insert(id.clone())
    }

    /// Undo `begin_launch` after the host rejected the command.
    pub fn rollback_launch(&mut self, id: &ProfileId) -> bool {
        self.launching.remove(id)
    }

    /// Undo `begin_stop` after the host rejected the command.
    pub fn rollback_stop(&mut self, id: &ProfileId) -> bool {
        self.stopping.remove(id)
    }

    /// Apply a host lifecycle notification. Clears any pending transition
    /// unconditionally and sets running-set membership. Returns whether the
    /// running-set changed.
    pub fn on_lifecycle_event(&mut self, id: &ProfileId, is_running: bool) -> bool {
        self.launching.remove(id);
        self.stopping.remove(id);
        if is_running {
            self.running.insert(id.clone())
        } else {
            self.running.remove(id)
        }
    }

    pub fn begin_upload(&mut self, id: &ProfileId) -> bool {
        self.uploading.insert(id.clone())
    }

    pub fn finish_upload(&mut self, id: &ProfileId) -> bool {
        self.uploading.remove(id)
    }

    pub fn is_uploading(&self, id: &ProfileId) -> bool {
        self.uploading.contains(id)
    }

    /// Last-write-wins; the token is stored as delivered.
    pub fn set_sync_status(&mut self, id: &ProfileId, status: String) {
        self.sync_status.insert(id.clone(), status);
    }

    pub fn sync_status(&self, id: &ProfileId) -> Option<&str> {
        self.sync_status.get(id).map(String::as_str)
    }

    /// Eligible for fleet-wide operations such as "select all launchable".
    pub fn is_eligible<L: UpdateLocks + ?Sized>(&self, record: &ProfileRecord, locks: &L) -> bool {
        self.phase(&record.id) == LifecyclePhase::Idle && !locks.is_updating(&record.browser)
    }

    /// Anything in flight for this profile: a phase other than idle, an
    /// upload, or a host-wide update of its browser kind.
    pub fn is_busy<L: UpdateLocks + ?Sized>(&self, record: &ProfileRecord, locks: &L) -> bool {
        !self.is_eligible(record, locks) || self.is_uploading(&record.id)
    }

    pub fn running_ids(&self) -> &HashSet<ProfileId> {
        &self.running
    }

    pub fn any_running(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn counts<'a>(&self, records: impl IntoIterator<Item = &'a ProfileRecord>) -> PhaseCounts {
        let mut counts = PhaseCounts::default();
        for record in records {
            match self.phase(&record.id) {
                LifecyclePhase::Idle => counts.idle += 1,
                LifecyclePhase::Launching => counts.launching += 1,
                LifecyclePhase::Running => counts.running += 1,
                LifecyclePhase::Stopping => counts.stopping += 1,
            }
        }
        counts
    }

    #[cfg(test)]
    fn launching_and_stopping_overlap(&self) -> bool {
        self.launching.intersection(&self.stopping).next().is_some()
    }
}
