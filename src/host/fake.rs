//! Scriptable in-memory host used by the fleet core's tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};

use super::{
    EventChannel, HostError, LifecycleEvent, MetricsSource, ProcessRegistry, Subscription,
    SyncStatusEvent, UpdateLocks,
};
use crate::models::{MetricSnapshot, ProfileId, ProfileRecord};

pub struct FakeHost {
    pub records: Mutex<Vec<ProfileRecord>>,
    pub running: Mutex<Vec<ProfileId>>,
    pub fail_launch: Mutex<HashSet<ProfileId>>,
    pub fail_stop: Mutex<HashSet<ProfileId>>,
    pub fail_upload: AtomicBool,
    pub fail_lifecycle_subscription: AtomicBool,
    pub fail_sync_subscription: AtomicBool,
    pub metric_responses: Mutex<VecDeque<Result<Vec<MetricSnapshot>, HostError>>>,
    pub fetch_count: AtomicUsize,
    pub launch_calls: Mutex<Vec<ProfileId>>,
    pub group_calls: Mutex<Vec<(Vec<ProfileId>, Option<String>)>>,
    pub updating: Mutex<HashSet<String>>,
    /// Subscriptions resolve only while permits are available.
    subscribe_gate: Semaphore,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    sync_tx: broadcast::Sender<SyncStatusEvent>,
}

impl FakeHost {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        let (lifecycle_tx, _) = broadcast::channel(64);
        let (sync_tx, _) = broadcast::channel(64);
        Self {
            records: Mutex::new(records),
            running: Mutex::new(Vec::new()),
            fail_launch: Mutex::new(HashSet::new()),
            fail_stop: Mutex::new(HashSet::new()),
            fail_upload: AtomicBool::new(false),
            fail_lifecycle_subscription: AtomicBool::new(false),
            fail_sync_subscription: AtomicBool::new(false),
            metric_responses: Mutex::new(VecDeque::new()),
            fetch_count: AtomicUsize::new(0),
            launch_calls: Mutex::new(Vec::new()),
            group_calls: Mutex::new(Vec::new()),
            updating: Mutex::new(HashSet::new()),
            subscribe_gate: Semaphore::new(Semaphore::MAX_PERMITS),
            lifecycle_tx,
            sync_tx,
        }
    }

    /// `count` records named `p0..p{count-1}`, created at ascending times.
    pub fn with_profiles(count: usize) -> Self {
        let records = (0..count)
            .map(|i| ProfileRecord::new(format!("p{i}"), &format!("profile {i}"), "camoufox", i as u64))
            .collect();
        Self::new(records)
    }

    /// Like `new`, but subscriptions stay pending until [`FakeHost::release_subscriptions`].
    pub fn with_held_subscriptions(records: Vec<ProfileRecord>) -> Self {
        let mut host = Self::new(records);
        host.subscribe_gate = Semaphore::new(0);
        host
    }

    pub fn release_subscriptions(&self) {
        self.subscribe_gate.add_permits(2);
    }

    pub fn emit_lifecycle(&self, id: &str, is_running: bool) {
        let _ = self.lifecycle_tx.send(LifecycleEvent::new(id, is_running));
    }

    pub fn emit_sync_status(&self, id: &str, status: &str) {
        let _ = self.sync_tx.send(SyncStatusEvent::new(id, status));
    }

    pub fn lifecycle_subscribers(&self) -> usize {
        self.lifecycle_tx.receiver_count()
    }

    pub fn push_metrics(&self, response: Result<Vec<MetricSnapshot>, HostError>) {
        self.metric_responses.lock().push_back(response);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Ok(permit) = self.subscribe_gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl ProcessRegistry for FakeHost {
    async fn list_processes(&self) -> Result<Vec<ProfileRecord>, HostError> {
        Ok(self.records.lock().clone())
    }

    async fn running_ids(&self) -> Result<Vec<ProfileId>, HostError> {
        Ok(self.running.lock().clone())
    }

    async fn launch_process(&self, id: &ProfileId) -> Result<(), HostError> {
        self.launch_calls.lock().push(id.clone());
        if self.fail_launch.lock().contains(id) {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: "engine missing".to_string(),
            });
        }
        Ok(())
    }

    async fn stop_process(&self, id: &ProfileId) -> Result<(), HostError> {
        if self.fail_stop.lock().contains(id) {
            return Err(HostError::Unavailable("supervisor gone".to_string()));
        }
        Ok(())
    }

    async fn upload_profile(&self, id: &ProfileId) -> Result<String, HostError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("remote directory offline".to_string()));
        }
        Ok(format!("remote://profiles/{id}"))
    }

    async fn assign_group(
        &self,
        ids: &[ProfileId],
        group: Option<String>,
    ) -> Result<(), HostError> {
        let mut records = self.records.lock();
        for record in records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.group_id = group.clone();
        }
        self.group_calls.lock().push((ids.to_vec(), group));
        Ok(())
    }
}

#[async_trait]
impl EventChannel for FakeHost {
    async fn subscribe_lifecycle(&self) -> Result<Subscription<LifecycleEvent>, HostError> {
        self.pass_gate().await;
        if self.fail_lifecycle_subscription.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("event bus down".to_string()));
        }
        Ok(Subscription::new("lifecycle", self.lifecycle_tx.subscribe()))
    }

    async fn subscribe_sync_status(&self) -> Result<Subscription<SyncStatusEvent>, HostError> {
        self.pass_gate().await;
        if self.fail_sync_subscription.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("event bus down".to_string()));
        }
        Ok(Subscription::new("sync-status", self.sync_tx.subscribe()))
    }
}

#[async_trait]
impl MetricsSource for FakeHost {
    async fn fetch_all_metrics(&self) -> Result<Vec<MetricSnapshot>, HostError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.metric_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl UpdateLocks for FakeHost {
    fn is_updating(&self, browser: &str) -> bool {
        self.updating.lock().contains(browser)
    }
}
