//! Metrics polling.
//!
//! A fixed-interval timer runs only while at least one profile is running.
//! Every tick issues one bulk fetch; responses may overlap and arrive out of
//! order, so they are merged by timestamp instead of replacing the cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{FleetEvent, Inbox};
use crate::host::{Host, HostError};
use crate::models::{MetricSnapshot, ProfileId};

/// Latest snapshot per running profile.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    snapshots: HashMap<ProfileId, MetricSnapshot>,
}

impl SnapshotCache {
    /// Keep a snapshot only if its profile is running and it is strictly newer
    /// than the one held. Returns how many snapshots were retained.
    pub fn merge(&mut self, incoming: Vec<MetricSnapshot>, running: &HashSet<ProfileId>) -> usize {
        let mut retained = 0;
        for snapshot in incoming {
            if !running.contains(&snapshot.id) {
                continue;
            }
            if let Some(held) = self.snapshots.get(&snapshot.id) {
                if held.updated_at >= snapshot.updated_at {
                    continue;
                }
            }
            self.snapshots.insert(snapshot.id.clone(), snapshot);
            retained += 1;
        }
        retained
    }

    pub fn get(&self, id: &ProfileId) -> Option<&MetricSnapshot> {
        self.snapshots.get(id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

pub struct MetricsPoller {
    interval: Duration,
    /// Present while the timer task runs; cancelling it stops the timer and
    /// silences fetches still in flight.
    timer: Option<CancellationToken>,
    cache: SnapshotCache,
}

impl MetricsPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: None,
            cache: SnapshotCache::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn snapshot(&self, id: &ProfileId) -> Option<&MetricSnapshot> {
        self.cache.get(id)
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Start or stop the timer to match whether anything is running.
    pub fn reconcile(
        &mut self,
        any_running: bool,
        host: &Arc<dyn Host>,
        inbox: &Inbox,
        alive: &CancellationToken,
    ) {
        if alive.is_cancelled() {
            self.stop();
            return;
        }
        match (any_running, self.is_active()) {
            (true, false) => self.start(host, inbox, alive),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    fn start(&mut self, host: &Arc<dyn Host>, inbox: &Inbox, alive: &CancellationToken) {
        let timer = alive.child_token();
        self.timer = Some(timer.clone());
        info!(interval_ms = self.interval.as_millis() as u64, "metrics polling started");

        let host = Arc::clone(host);
        let inbox = inbox.clone();
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = timer.cancelled() => break,
                    _ = ticker.tick() => spawn_fetch(&host, &inbox, &timer),
                }
            }
        });
    }

    /// Cancel the timer and forget every snapshot.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            info!("metrics polling stopped");
        }
        self.cache.clear();
    }

    /// Merge a fetch result. Failures keep the cache and the timer as they are.
    pub fn apply(
        &mut self,
        result: Result<Vec<MetricSnapshot>, HostError>,
        running: &HashSet<ProfileId>,
    ) {
        if !self.is_active() {
            return;
        }
        match result {
            Ok(snapshots) => {
                let received = snapshots.len();
                let retained = self.cache.merge(snapshots, running);
                debug!(received, retained, "metrics merged");
            }
            Err(e) => debug!(error = %e, "metrics fetch failed, retrying next tick"),
        }
    }
}

fn spawn_fetch(host: &Arc<dyn Host>, inbox: &Inbox, timer: &CancellationToken) {
    let host = Arc::clone(host);
    let inbox = inbox.clone();
    let live = timer.clone();
    tokio::spawn(async move {
        let result = tokio::select! {
            biased;
            _ = live.cancelled() => return,
            result = host.fetch_all_metrics() => result,
        };
        if !live.is_cancelled() {
            let _ = inbox.send(FleetEvent::Metrics(result));
        }
    });
}
