//! The fleet view: owner of every piece of fleet state for one mounted
//! lifetime.
//!
//! Mutations happen only through `&mut FleetView`, on the task that owns it.
//! Host calls run as spawned tasks whose completions come back through the
//! inbox and are applied by [`FleetView::apply`]. After [`FleetView::teardown`]
//! nothing reaches the state anymore.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ingest;
use super::poller::MetricsPoller;
use super::selection::SelectionReconciler;
use super::sort::{visible_order, Partition, SortSpec};
use super::state::{FleetState, LifecyclePhase, PhaseCounts};
use super::window::{RowHeight, VirtualList};
use super::{CommandKind, FleetEvent, Inbox};
use crate::constants::{
    DEFAULT_OVERSCAN_ROWS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_ROW_HEIGHT_ESTIMATE,
    MAX_MEASURE_PASSES, MAX_PENDING_NOTICES,
};
use crate::host::{Host, HostError};
use crate::models::{MetricSnapshot, ProfileId, ProfileRecord};

#[derive(Debug, Clone)]
pub struct FleetOptions {
    pub poll_interval: Duration,
    pub row_height_estimate: u32,
    pub overscan_rows: usize,
    pub sort: SortSpec,
    pub partition: Partition,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            row_height_estimate: DEFAULT_ROW_HEIGHT_ESTIMATE,
            overscan_rows: DEFAULT_OVERSCAN_ROWS,
            sort: SortSpec::default(),
            partition: Partition::All,
        }
    }
}

/// Row-level commands exposed to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetAction {
    Launch(ProfileId),
    Stop(ProfileId),
    Upload(ProfileId),
    OpenDetail(ProfileId),
    AssignGroup {
        ids: Vec<ProfileId>,
        group: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Forwarded to the host; the result arrives through the inbox.
    Started,
    /// Preconditions failed; nothing changed.
    Ignored,
    ShowDetail(ProfileId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Everything needed to draw one row.
#[derive(Debug, Clone)]
pub struct FleetRow<'a> {
    /// Position in the visible order.
    pub position: usize,
    pub record: &'a ProfileRecord,
    pub phase: LifecyclePhase,
    pub uploading: bool,
    pub updating: bool,
    pub metric: Option<&'a MetricSnapshot>,
    pub sync_status: Option<&'a str>,
    pub selected: bool,
    pub selectable: bool,
}

impl FleetRow<'_> {
    pub fn is_busy(&self) -> bool {
        !self.selectable
    }
}

pub struct FleetView {
    host: Arc<dyn Host>,
    inbox_tx: Inbox,
    inbox_rx: mpsc::UnboundedReceiver<FleetEvent>,
    alive: CancellationToken,
    mounted: bool,

    records: Vec<ProfileRecord>,
    index: HashMap<ProfileId, usize>,
    /// Visible order as indices into `records`.
    order: Vec<usize>,
    sort: SortSpec,
    partition: Partition,
    filter_text: String,

    state: FleetState,
    poller: MetricsPoller,
    selection: SelectionReconciler,
    list: VirtualList,
    push_degraded: bool,
    notices: VecDeque<Notice>,
}

impl FleetView {
    pub fn new(host: Arc<dyn Host>, options: FleetOptions) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            host,
            inbox_tx,
            inbox_rx,
            alive: CancellationToken::new(),
            mounted: false,
            records: Vec::new(),
            index: HashMap::new(),
            order: Vec::new(),
            sort: options.sort,
            partition: options.partition,
            filter_text: String::new(),
            state: FleetState::new(),
            poller: MetricsPoller::new(options.poll_interval),
            selection: SelectionReconciler::new(),
            list: VirtualList::new(options.row_height_estimate, options.overscan_rows),
            push_degraded: false,
            notices: VecDeque::new(),
        }
    }

    // ── Lifetime ──────────────────────────────────────────────────

    /// Subscribe to push events, load the record list and seed the
    /// running-set. Subscriptions are set up once per lifetime.
    pub fn mount(&mut self) {
        if self.mounted || self.alive.is_cancelled() {
            return;
        }
        self.mounted = true;
        ingest::spawn_forwarders(&self.host, &self.inbox_tx, &self.alive);
        self.refresh();
        let host = Arc::clone(&self.host);
        self.spawn_guarded(async move { FleetEvent::RunningSeed(host.running_ids().await) });
        info!("fleet view mounted");
    }

    /// Unsubscribe, stop polling and turn every pending completion into a
    /// no-op.
    pub fn teardown(&mut self) {
        if self.alive.is_cancelled() {
            return;
        }
        self.alive.cancel();
        self.poller.stop();
        info!("fleet view torn down");
    }

    pub fn is_live(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Reload the record list from the registry.
    pub fn refresh(&self) {
        let host = Arc::clone(&self.host);
        self.spawn_guarded(async move { FleetEvent::Records(host.list_processes().await) });
    }

    fn spawn_guarded<F>(&self, work: F)
    where
        F: Future<Output = FleetEvent> + Send + 'static,
    {
        let inbox = self.inbox_tx.clone();
        let alive = self.alive.clone();
        tokio::spawn(async move {
            let event = tokio::select! {
                biased;
                _ = alive.cancelled() => return,
                event = work => event,
            };
            if !alive.is_cancelled() {
                let _ = inbox.send(event);
            }
        });
    }

    // ── Inbox ─────────────────────────────────────────────────────

    /// Next completion from background work.
    pub async fn recv(&mut self) -> Option<FleetEvent> {
        self.inbox_rx.recv().await
    }

    /// Apply everything already waiting in the inbox.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: FleetEvent) {
        if !self.is_live() {
            debug!("event after teardown ignored");
            return;
        }
        match event {
            FleetEvent::Records(Ok(records)) => self.set_records(records),
            FleetEvent::Records(Err(e)) => {
                warn!(error = %e, "profile list unavailable");
                self.notify(NoticeLevel::Error, format!("Could not load profiles: {e}"));
            }
            FleetEvent::RunningSeed(Ok(ids)) => {
                for id in &ids {
                    self.state.on_lifecycle_event(id, true);
                }
                debug!(running = ids.len(), "running-set seeded");
            }
            FleetEvent::RunningSeed(Err(e)) => {
                warn!(error = %e, "could not read running profiles");
            }
            FleetEvent::Lifecycle(event) => {
                let changed = self.state.on_lifecycle_event(&event.id, event.is_running);
                debug!(id = %event.id, is_running = event.is_running, changed, "lifecycle event");
            }
            FleetEvent::SyncStatus(event) => {
                debug!(id = %event.id, status = %event.status, "sync status");
                self.state.set_sync_status(&event.id, event.status);
            }
            FleetEvent::SubscriptionFailed { channel } => {
                warn!(channel, "push updates degraded, relying on polling");
                self.push_degraded = true;
            }
            FleetEvent::Metrics(result) => self.poller.apply(result, self.state.running_ids()),
            FleetEvent::CommandFinished { kind, id, result } => {
                self.finish_command(kind, &id, result)
            }
            FleetEvent::UploadFinished { id, result } => self.finish_upload(&id, result),
            FleetEvent::GroupAssigned {
                count,
                group,
                result,
            } => self.finish_group(count, group, result),
        }
        self.reconcile_poller();
    }

    fn reconcile_poller(&mut self) {
        self.poller.reconcile(
            self.state.any_running(),
            &self.host,
            &self.inbox_tx,
            &self.alive,
        );
    }

    fn finish_command(&mut self, kind: CommandKind, id: &ProfileId, result: Result<(), HostError>) {
        match result {
            Ok(()) => debug!(id = %id, command = kind.verb(), "host accepted command"),
            Err(e) => {
                let rolled_back = match kind {
                    CommandKind::Launch => self.state.rollback_launch(id),
                    CommandKind::Stop => self.state.rollback_stop(id),
                };
                warn!(id = %id, command = kind.verb(), rolled_back, error = %e, "host rejected command");
                let name = self.display_name(id);
                self.notify(NoticeLevel::Error, format!("Failed to {} {name}: {e}", kind.verb()));
            }
        }
    }

    fn finish_upload(&mut self, id: &ProfileId, result: Result<String, HostError>) {
        self.state.finish_upload(id);
        let name = self.display_name(id);
        match result {
            Ok(url) => {
                info!(id = %id, url = %url, "profile uploaded");
                self.notify(NoticeLevel::Info, format!("Synced {name} to {url}"));
                self.refresh();
            }
            Err(e) => {
                warn!(id = %id, error = %e, "upload failed");
                self.notify(NoticeLevel::Error, format!("Upload of {name} failed: {e}"));
            }
        }
    }

    fn finish_group(&mut self, count: usize, group: Option<String>, result: Result<(), HostError>) {
        let target = group.as_deref().unwrap_or("no group");
        match result {
            Ok(()) => {
                info!(count, group = target, "group assigned");
                self.notify(NoticeLevel::Info, format!("Moved {count} profile(s) to {target}"));
                self.refresh();
            }
            Err(e) => {
                warn!(count, group = target, error = %e, "group assignment failed");
                self.notify(NoticeLevel::Error, format!("Could not assign group: {e}"));
            }
        }
    }

    fn display_name(&self, id: &ProfileId) -> String {
        self.record(id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn notify(&mut self, level: NoticeLevel, text: String) {
        if self.notices.len() >= MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice { level, text });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // ── Records and ordering ──────────────────────────────────────

    fn set_records(&mut self, records: Vec<ProfileRecord>) {
        self.index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        self.records = records;
        debug!(count = self.records.len(), "profile list replaced");
        self.rebuild_order();
    }

    fn rebuild_order(&mut self) {
        self.order = visible_order(&self.records, self.partition, &self.filter_text, self.sort);
        self.list.reset_rows(self.order.len());
    }

    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    pub fn record(&self, id: &ProfileId) -> Option<&ProfileRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Record at a position of the visible order.
    pub fn record_at(&self, position: usize) -> Option<&ProfileRecord> {
        self.order.get(position).map(|&i| &self.records[i])
    }

    pub fn visible_len(&self) -> usize {
        self.order.len()
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn set_sort(&mut self, spec: SortSpec) {
        if spec != self.sort {
            self.sort = spec;
            self.rebuild_order();
        }
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn set_partition(&mut self, partition: Partition) {
        if partition != self.partition {
            self.partition = partition;
            self.rebuild_order();
        }
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn set_filter_text(&mut self, text: &str) {
        if text != self.filter_text {
            self.filter_text = text.to_string();
            self.rebuild_order();
        }
    }

    /// Records per partition, independent of the active one.
    pub fn partition_len(&self, partition: Partition) -> usize {
        self.records.iter().filter(|r| partition.matches(r)).count()
    }

    // ── Live state ────────────────────────────────────────────────

    pub fn state(&self) -> &FleetState {
        &self.state
    }

    pub fn phase(&self, id: &ProfileId) -> LifecyclePhase {
        self.state.phase(id)
    }

    pub fn counts(&self) -> PhaseCounts {
        self.state.counts(&self.records)
    }

    pub fn snapshot(&self, id: &ProfileId) -> Option<&MetricSnapshot> {
        self.poller.snapshot(id)
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Push channel could not be subscribed; phases update only from
    /// optimistic actions and their rollbacks.
    pub fn push_degraded(&self) -> bool {
        self.push_degraded
    }

    /// Anything in flight for the profile (transition, upload, update lock).
    pub fn is_busy(&self, id: &ProfileId) -> bool {
        self.record(id)
            .is_some_and(|r| self.state.is_busy(r, self.host.as_ref()))
    }

    // ── Actions ───────────────────────────────────────────────────

    pub fn dispatch(&mut self, action: FleetAction) -> DispatchOutcome {
        if !self.is_live() {
            return DispatchOutcome::Ignored;
        }
        let outcome = match action {
            FleetAction::Launch(id) => self.launch(&id),
            FleetAction::Stop(id) => self.stop(&id),
            FleetAction::Upload(id) => self.upload(&id),
            FleetAction::OpenDetail(id) => match self.record(&id) {
                Some(_) => DispatchOutcome::ShowDetail(id),
                None => DispatchOutcome::Ignored,
            },
            FleetAction::AssignGroup { ids, group } => self.assign_group(ids, group),
        };
        debug!(?outcome, "action dispatched");
        outcome
    }

    fn launch(&mut self, id: &ProfileId) -> DispatchOutcome {
        let Some(&i) = self.index.get(id) else {
            return DispatchOutcome::Ignored;
        };
        if !self.state.begin_launch(&self.records[i], self.host.as_ref()) {
            return DispatchOutcome::Ignored;
        }
        let host = Arc::clone(&self.host);
        let id = id.clone();
        self.spawn_guarded(async move {
            let result = host.launch_process(&id).await;
            FleetEvent::CommandFinished {
                kind: CommandKind::Launch,
                id,
                result,
            }
        });
        DispatchOutcome::Started
    }

    fn stop(&mut self, id: &ProfileId) -> DispatchOutcome {
        if !self.index.contains_key(id) || !self.state.begin_stop(id) {
            return DispatchOutcome::Ignored;
        }
        let host = Arc::clone(&self.host);
        let id = id.clone();
        self.spawn_guarded(async move {
            let result = host.stop_process(&id).await;
            FleetEvent::CommandFinished {
                kind: CommandKind::Stop,
                id,
                result,
            }
        });
        DispatchOutcome::Started
    }

    fn upload(&mut self, id: &ProfileId) -> DispatchOutcome {
        if !self.index.contains_key(id) || !self.state.begin_upload(id) {
            return DispatchOutcome::Ignored;
        }
        let host = Arc::clone(&self.host);
        let id = id.clone();
        self.spawn_guarded(async move {
            let result = host.upload_profile(&id).await;
            FleetEvent::UploadFinished { id, result }
        });
        DispatchOutcome::Started
    }

    fn assign_group(&mut self, ids: Vec<ProfileId>, group: Option<String>) -> DispatchOutcome {
        let ids: Vec<ProfileId> = ids
            .into_iter()
            .filter(|id| self.index.contains_key(id))
            .collect();
        if ids.is_empty() {
            return DispatchOutcome::Ignored;
        }
        let host = Arc::clone(&self.host);
        self.spawn_guarded(async move {
            let result = host.assign_group(&ids, group.clone()).await;
            FleetEvent::GroupAssigned {
                count: ids.len(),
                group,
                result,
            }
        });
        DispatchOutcome::Started
    }

    /// Launch every selected profile that is eligible. Returns how many
    /// launches were started.
    pub fn launch_selection(&mut self) -> usize {
        self.selection
            .selected()
            .into_iter()
            .filter(|id| self.launch(id) == DispatchOutcome::Started)
            .count()
    }

    /// Stop every selected profile that is running.
    pub fn stop_selection(&mut self) -> usize {
        self.selection
            .selected()
            .into_iter()
            .filter(|id| self.stop(id) == DispatchOutcome::Started)
            .count()
    }

    // ── Selection ─────────────────────────────────────────────────

    /// Bring the internal selection and the external list into agreement.
    /// External changes are read first, then internal changes are written
    /// back. Returns whether `external` was rewritten.
    pub fn reconcile_selection(&mut self, external: &mut Vec<ProfileId>) -> bool {
        self.selection.sync_inbound(external);
        match self.selection.sync_outbound(external) {
            Some(next) => {
                *external = next;
                true
            }
            None => false,
        }
    }

    fn is_selectable(&self, record: &ProfileRecord) -> bool {
        !self.state.is_busy(record, self.host.as_ref())
    }

    pub fn toggle_selected(&mut self, id: &ProfileId) -> bool {
        let selectable = self.record(id).is_some_and(|r| self.is_selectable(r));
        self.selection.toggle(id, selectable)
    }

    /// Select every selectable profile of the current view.
    pub fn select_all_eligible(&mut self) -> usize {
        let eligible: Vec<ProfileId> = self
            .order
            .iter()
            .map(|&i| &self.records[i])
            .filter(|r| self.is_selectable(r))
            .map(|r| r.id.clone())
            .collect();
        self.selection.select_all(&eligible)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    pub fn selected(&self) -> Vec<ProfileId> {
        self.selection.selected()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn show_selection_affordances(&self) -> bool {
        self.selection.show_affordances()
    }

    // ── Virtualized list ──────────────────────────────────────────

    pub fn list(&self) -> &VirtualList {
        &self.list
    }

    pub fn set_viewport(&mut self, height: u32) {
        self.list.set_viewport(height);
    }

    pub fn scroll_by(&mut self, delta: i64) -> bool {
        self.list.scroll_by(delta)
    }

    pub fn ensure_visible(&mut self, position: usize) -> bool {
        self.list.ensure_visible(position)
    }

    pub fn row_at(&self, position: usize) -> Option<FleetRow<'_>> {
        let &i = self.order.get(position)?;
        let record = &self.records[i];
        Some(FleetRow {
            position,
            record,
            phase: self.state.phase(&record.id),
            uploading: self.state.is_uploading(&record.id),
            updating: self.host.is_updating(&record.browser),
            metric: self.poller.snapshot(&record.id),
            sync_status: self.state.sync_status(&record.id),
            selected: self.selection.is_selected(&record.id),
            selectable: self.is_selectable(record),
        })
    }

    /// Rows of the current window, overscan included.
    pub fn visible_rows(&self) -> Vec<FleetRow<'_>> {
        self.list
            .window()
            .indices()
            .filter_map(|position| self.row_at(position))
            .collect()
    }

    /// Lay out the rows of the current window and feed their heights back
    /// into the list. Measuring can shift the window onto rows that still
    /// carry an estimate, so this repeats a bounded number of times.
    pub fn measure_visible<F>(&mut self, measure: F) -> bool
    where
        F: Fn(&FleetRow<'_>) -> u32,
    {
        let mut changed = false;
        for _ in 0..MAX_MEASURE_PASSES {
            let heights: Vec<(usize, u32)> = self
                .visible_rows()
                .iter()
                .map(|row| (row.position, measure(row)))
                .collect();
            for (position, height) in heights {
                changed |= self.list.measure(position, height);
            }
            let window = self.list.window();
            let settled = window
                .heights
                .iter()
                .all(|h| matches!(h, RowHeight::Measured(_)));
            if settled {
                break;
            }
        }
        changed
    }
}

impl Drop for FleetView {
    fn drop(&mut self) {
        self.teardown();
    }
}
