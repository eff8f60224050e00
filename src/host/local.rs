//! Local host backed by the on-disk profile directory.
//!
//! Profiles live at `<profiles_dir>/<uuid>/metadata.json`. Browser processes
//! are simulated: launch and stop resolve after a configurable latency and
//! announce themselves on the lifecycle channel, the same way a real
//! supervisor reports engine start/exit.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    EventChannel, HostError, LifecycleEvent, MetricsSource, ProcessRegistry, Subscription,
    SyncStatusEvent, UpdateLocks,
};
use crate::constants::*;
use crate::models::{MetricSnapshot, ProfileId, ProfileRecord, TrafficStats};

/// Simulated command latencies.
#[derive(Debug, Clone, Copy)]
pub struct HostDelays {
    pub launch: Duration,
    pub stop: Duration,
    pub upload: Duration,
}

impl Default for HostDelays {
    fn default() -> Self {
        Self {
            launch: Duration::from_millis(DEFAULT_LAUNCH_DELAY_MS),
            stop: Duration::from_millis(DEFAULT_STOP_DELAY_MS),
            upload: Duration::from_millis(DEFAULT_UPLOAD_DELAY_MS),
        }
    }
}

/// On-disk profile metadata. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ProfileMetadata {
    id: String,
    name: String,
    browser: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    proxy_id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    sync_enabled: bool,
    #[serde(default)]
    odoo_id: Option<String>,
    #[serde(default)]
    created_at: Option<u64>,
}

impl ProfileMetadata {
    fn into_record(self) -> Option<ProfileRecord> {
        let uuid = uuid::Uuid::parse_str(&self.id).ok()?;
        Some(ProfileRecord {
            id: ProfileId::from(uuid),
            name: self.name,
            browser: self.browser,
            version: self.version,
            created_at: self.created_at.unwrap_or(0),
            remote_id: self.odoo_id,
            group_id: self.group_id,
            tags: self.tags,
            note: self.note,
            proxy_id: self.proxy_id,
            sync_enabled: self.sync_enabled,
        })
    }
}

pub struct LocalHost {
    profiles_dir: PathBuf,
    delays: HostDelays,
    /// Running profiles and when they started.
    running: Mutex<HashMap<ProfileId, Instant>>,
    /// Profiles with a launch or stop in flight.
    pending: Mutex<HashSet<ProfileId>>,
    updating: RwLock<HashSet<String>>,
    last_metric_ms: Mutex<u64>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    sync_tx: broadcast::Sender<SyncStatusEvent>,
}

impl LocalHost {
    pub fn new(profiles_dir: impl Into<PathBuf>, delays: HostDelays) -> Self {
        let (lifecycle_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (sync_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            profiles_dir: profiles_dir.into(),
            delays,
            running: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
            updating: RwLock::new(HashSet::new()),
            last_metric_ms: Mutex::new(0),
            lifecycle_tx,
            sync_tx,
        }
    }

    /// Mark a browser kind as being updated host-wide (blocks launches).
    pub fn set_updating(&self, browser: &str, updating: bool) {
        let mut set = self.updating.write();
        if updating {
            set.insert(browser.to_string());
        } else {
            set.remove(browser);
        }
    }

    fn metadata_path(&self, id: &ProfileId) -> PathBuf {
        self.profiles_dir.join(id.as_str()).join("metadata.json")
    }

    async fn load_record(&self, id: &ProfileId) -> Result<ProfileRecord, HostError> {
        let content = match tokio::fs::read_to_string(self.metadata_path(id)).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HostError::NotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let meta: ProfileMetadata = serde_json::from_str(&content)?;
        meta.into_record()
            .ok_or_else(|| HostError::NotFound(id.clone()))
    }

    /// Read-modify-write of one profile's metadata file, keeping fields we
    /// don't model intact.
    async fn update_metadata(
        &self,
        id: &ProfileId,
        edit: impl FnOnce(&mut serde_json::Map<String, serde_json::Value>),
    ) -> Result<(), HostError> {
        let path = self.metadata_path(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HostError::NotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut value: serde_json::Value = serde_json::from_str(&content)?;
        let Some(object) = value.as_object_mut() else {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: "metadata is not a JSON object".to_string(),
            });
        };
        edit(object);
        tokio::fs::write(&path, serde_json::to_string_pretty(&value)?).await?;
        Ok(())
    }

    fn begin_command(&self, id: &ProfileId) -> Result<(), HostError> {
        if !self.pending.lock().insert(id.clone()) {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: "another command is in progress".to_string(),
            });
        }
        Ok(())
    }

    fn next_metric_timestamp(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_metric_ms.lock();
        *last = now.max(*last + 1);
        *last
    }
}

/// Deterministic per-profile traffic rate so rows differ visibly.
fn traffic_for(id: &ProfileId, elapsed: Duration) -> TrafficStats {
    let seed: u64 = id.as_str().bytes().map(u64::from).sum();
    let ms = elapsed.as_millis() as u64;
    let bytes_sent = ms * (seed % 40 + 8);
    TrafficStats {
        bytes_sent,
        bytes_received: bytes_sent * 3,
        requests: ms / 250,
        active_connections: (seed % 6) as u32 + 1,
    }
}

#[async_trait]
impl ProcessRegistry for LocalHost {
    async fn list_processes(&self) -> Result<Vec<ProfileRecord>, HostError> {
        let mut entries = match tokio::fs::read_dir(&self.profiles_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta_path = entry.path().join("metadata.json");
            let content = match tokio::fs::read_to_string(&meta_path).await {
                Ok(c) => c,
                Err(_) => continue,
            };
            match serde_json::from_str::<ProfileMetadata>(&content) {
                Ok(meta) => match meta.into_record() {
                    Some(record) => records.push(record),
                    None => warn!(path = %meta_path.display(), "skipping profile with invalid id"),
                },
                Err(e) => {
                    warn!(path = %meta_path.display(), error = %e, "skipping malformed profile metadata")
                }
            }
        }
        debug!(count = records.len(), "listed profiles");
        Ok(records)
    }

    async fn running_ids(&self) -> Result<Vec<ProfileId>, HostError> {
        Ok(self.running.lock().keys().cloned().collect())
    }

    async fn launch_process(&self, id: &ProfileId) -> Result<(), HostError> {
        let record = self.load_record(id).await?;
        if self.is_updating(&record.browser) {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: format!("{} is being updated", record.browser),
            });
        }
        if self.running.lock().contains_key(id) {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: "already running".to_string(),
            });
        }
        self.begin_command(id)?;

        tokio::time::sleep(self.delays.launch).await;

        self.pending.lock().remove(id);
        self.running.lock().insert(id.clone(), Instant::now());
        info!(profile = %id, browser = %record.browser, "browser started");
        // No subscribers is fine: nobody is watching.
        let _ = self.lifecycle_tx.send(LifecycleEvent::new(id.clone(), true));
        Ok(())
    }

    async fn stop_process(&self, id: &ProfileId) -> Result<(), HostError> {
        if !self.running.lock().contains_key(id) {
            return Err(HostError::Rejected {
                id: id.clone(),
                reason: "not running".to_string(),
            });
        }
        self.begin_command(id)?;

        tokio::time::sleep(self.delays.stop).await;

        self.pending.lock().remove(id);
        self.running.lock().remove(id);
        info!(profile = %id, "browser stopped");
        let _ = self.lifecycle_tx.send(LifecycleEvent::new(id.clone(), false));
        Ok(())
    }

    async fn upload_profile(&self, id: &ProfileId) -> Result<String, HostError> {
        let record = self.load_record(id).await?;
        let _ = self.sync_tx.send(SyncStatusEvent::new(id.clone(), "syncing"));

        tokio::time::sleep(self.delays.upload).await;

        let remote_id = record
            .remote_id
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("rp-{}", &id.as_str()[..8.min(id.as_str().len())]));
        let url = format!("remote://profiles/{remote_id}");

        let written = self
            .update_metadata(id, |meta| {
                meta.insert("odoo_id".into(), serde_json::Value::String(remote_id.clone()));
                meta.insert("profile_url".into(), serde_json::Value::String(url.clone()));
                meta.insert(
                    "last_sync".into(),
                    serde_json::Value::from(chrono::Utc::now().timestamp().max(0) as u64),
                );
            })
            .await;

        match written {
            Ok(()) => {
                info!(profile = %id, %url, "profile uploaded");
                let _ = self.sync_tx.send(SyncStatusEvent::new(id.clone(), "synced"));
                Ok(url)
            }
            Err(e) => {
                let _ = self.sync_tx.send(SyncStatusEvent::new(id.clone(), "error"));
                Err(e)
            }
        }
    }

    async fn assign_group(
        &self,
        ids: &[ProfileId],
        group: Option<String>,
    ) -> Result<(), HostError> {
        for id in ids {
            let value = group
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null);
            self.update_metadata(id, |meta| {
                meta.insert("group_id".into(), value);
            })
            .await?;
        }
        info!(count = ids.len(), group = ?group, "assigned profiles to group");
        Ok(())
    }
}

#[async_trait]
impl EventChannel for LocalHost {
    async fn subscribe_lifecycle(&self) -> Result<Subscription<LifecycleEvent>, HostError> {
        Ok(Subscription::new("lifecycle", self.lifecycle_tx.subscribe()))
    }

    async fn subscribe_sync_status(&self) -> Result<Subscription<SyncStatusEvent>, HostError> {
        Ok(Subscription::new("sync-status", self.sync_tx.subscribe()))
    }
}

#[async_trait]
impl MetricsSource for LocalHost {
    async fn fetch_all_metrics(&self) -> Result<Vec<MetricSnapshot>, HostError> {
        let running: Vec<(ProfileId, Instant)> = self
            .running
            .lock()
            .iter()
            .map(|(id, started)| (id.clone(), *started))
            .collect();
        let updated_at = self.next_metric_timestamp();
        Ok(running
            .into_iter()
            .map(|(id, started)| MetricSnapshot {
                traffic: traffic_for(&id, started.elapsed()),
                id,
                updated_at,
            })
            .collect())
    }
}

impl UpdateLocks for LocalHost {
    fn is_updating(&self, browser: &str) -> bool {
        self.updating.read().contains(browser)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const ID_A: &str = "5b0f0c3e-7f43-4a53-9a55-2a3e1b1f9d01";
    const ID_B: &str = "9c2d1e4f-0a1b-4c3d-8e5f-6a7b8c9d0e02";

    fn write_profile(dir: &Path, id: &str, body: &str) {
        let profile_dir = dir.join(id);
        std::fs::create_dir_all(&profile_dir).unwrap();
        std::fs::write(profile_dir.join("metadata.json"), body).unwrap();
    }

    fn profile_json(id: &str, name: &str, browser: &str) -> String {
        serde_json::json!({
            "id": id,
            "name": name,
            "browser": browser,
            "version": "135.0",
            "created_at": 1_700_000_000u64,
            "tags": ["shop"],
            "camoufox_config": { "fingerprint": "{}" }
        })
        .to_string()
    }

    fn instant_delays() -> HostDelays {
        HostDelays {
            launch: Duration::ZERO,
            stop: Duration::ZERO,
            upload: Duration::ZERO,
        }
    }

    fn host_with_two() -> (tempfile::TempDir, LocalHost) {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), ID_A, &profile_json(ID_A, "alpha", "camoufox"));
        write_profile(dir.path(), ID_B, &profile_json(ID_B, "beta", "wayfern"));
        let host = LocalHost::new(dir.path(), instant_delays());
        (dir, host)
    }

    #[tokio::test]
    async fn list_skips_malformed_and_invalid_ids() {
        let (dir, host) = host_with_two();
        write_profile(dir.path(), "broken", "{ not json");
        write_profile(dir.path(), "bad-id", &profile_json("bad-id", "gamma", "camoufox"));
        std::fs::create_dir_all(dir.path().join("no-metadata")).unwrap();

        let mut records = host.list_processes().await.unwrap();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(records[0].created_at, 1_700_000_000);
        assert_eq!(records[0].tags, vec!["shop".to_string()]);
        assert!(!records[0].is_linked());
    }

    #[tokio::test]
    async fn list_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let host = LocalHost::new(dir.path().join("nope"), instant_delays());
        assert!(host.list_processes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn launch_announces_running_and_rejects_duplicates() {
        let (_dir, host) = host_with_two();
        let mut sub = host.subscribe_lifecycle().await.unwrap();
        let id = ProfileId::from(ID_A);

        host.launch_process(&id).await.unwrap();
        assert_eq!(sub.recv().await, Some(LifecycleEvent::new(ID_A, true)));
        assert_eq!(host.running_ids().await.unwrap(), vec![id.clone()]);

        let err = host.launch_process(&id).await.unwrap_err();
        assert!(matches!(err, HostError::Rejected { .. }));
    }

    #[tokio::test]
    async fn launch_blocked_while_browser_updating() {
        let (_dir, host) = host_with_two();
        host.set_updating("wayfern", true);
        let err = host.launch_process(&ProfileId::from(ID_B)).await.unwrap_err();
        assert!(err.to_string().contains("being updated"));
        host.set_updating("wayfern", false);
        host.launch_process(&ProfileId::from(ID_B)).await.unwrap();
    }

    #[tokio::test]
    async fn launch_unknown_profile_is_not_found() {
        let (_dir, host) = host_with_two();
        let err = host.launch_process(&ProfileId::from("missing")).await.unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[tokio::test]
    async fn stop_idle_profile_is_rejected() {
        let (_dir, host) = host_with_two();
        let err = host.stop_process(&ProfileId::from(ID_A)).await.unwrap_err();
        assert!(matches!(err, HostError::Rejected { .. }));
    }

    #[tokio::test]
    async fn stop_announces_exit() {
        let (_dir, host) = host_with_two();
        let id = ProfileId::from(ID_A);
        host.launch_process(&id).await.unwrap();
        let mut sub = host.subscribe_lifecycle().await.unwrap();
        host.stop_process(&id).await.unwrap();
        assert_eq!(sub.recv().await, Some(LifecycleEvent::new(ID_A, false)));
        assert!(host.running_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metrics_only_for_running_with_increasing_timestamps() {
        let (_dir, host) = host_with_two();
        assert!(host.fetch_all_metrics().await.unwrap().is_empty());

        host.launch_process(&ProfileId::from(ID_A)).await.unwrap();
        let first = host.fetch_all_metrics().await.unwrap();
        let second = host.fetch_all_metrics().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id.as_str(), ID_A);
        assert!(second[0].updated_at > first[0].updated_at);
    }

    #[tokio::test]
    async fn assign_group_rewrites_metadata_and_keeps_unknown_fields() {
        let (dir, host) = host_with_two();
        host.assign_group(&[ProfileId::from(ID_A)], Some("team-1".to_string()))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join(ID_A).join("metadata.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["group_id"], "team-1");
        assert!(value.get("camoufox_config").is_some());

        host.assign_group(&[ProfileId::from(ID_A)], None).await.unwrap();
        let records = host.list_processes().await.unwrap();
        let alpha = records.iter().find(|r| r.name == "alpha").unwrap();
        assert_eq!(alpha.group_id, None);
    }

    #[tokio::test]
    async fn upload_links_profile_and_reports_sync_status() {
        let (_dir, host) = host_with_two();
        let mut sub = host.subscribe_sync_status().await.unwrap();
        let url = host.upload_profile(&ProfileId::from(ID_A)).await.unwrap();
        assert_eq!(url, "remote://profiles/rp-5b0f0c3e");

        assert_eq!(sub.recv().await.map(|e| e.status), Some("syncing".to_string()));
        assert_eq!(sub.recv().await.map(|e| e.status), Some("synced".to_string()));

        let records = host.list_processes().await.unwrap();
        let alpha = records.iter().find(|r| r.name == "alpha").unwrap();
        assert!(alpha.is_linked());
    }
}
