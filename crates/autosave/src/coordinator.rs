use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;

use stocktake_core::{BranchId, GroupTag};
use stocktake_records::CyclicItem;

use crate::persistence::{CountStore, PersistenceError};
use crate::validator::SaveValidator;

/// Quiet window before a scheduled save fires.
pub const DEBOUNCE: Duration = Duration::from_secs(2);

/// Minimum gap between two write **starts**. Earlier requests are rescheduled
/// to the boundary, never dropped.
pub const MIN_WRITE_INTERVAL: Duration = Duration::from_secs(5);

/// Transient-failure retries per save (linear backoff, `attempt * 1s`).
pub const MAX_RETRIES: u32 = 3;

/// Coordinator lifecycle state, published on the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    Idle,
    Scheduled,
    Saving,
    Retrying,
    Failed,
}

/// Last observed coordinator status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStatus {
    pub state: SaveState,
    pub completed_saves: u64,
    /// Set while `state == Failed`: validation rejection or exhausted retries.
    pub last_error: Option<String>,
}

impl SaveStatus {
    fn idle() -> Self {
        Self {
            state: SaveState::Idle,
            completed_saves: 0,
            last_error: None,
        }
    }
}

struct SaveRequest {
    batch: Vec<CyclicItem>,
    immediate: bool,
}

/// Debounced auto-save worker for one branch+group editing session.
///
/// At most one save is in flight; a batch arriving mid-save is captured for
/// the next cycle (whole-batch granularity, last-full-batch-write-wins). The
/// worker is torn down with the session: [`shutdown`](Self::shutdown) cancels
/// a pending scheduled save outright, while an in-flight write completes.
pub struct AutoSaveCoordinator {
    tx: mpsc::UnboundedSender<SaveRequest>,
    status_rx: watch::Receiver<SaveStatus>,
    shutdown: Arc<Notify>,
    handle: tokio::task::JoinHandle<()>,
}

impl AutoSaveCoordinator {
    /// Spawn the worker for one session. The store and validator move into
    /// the worker task.
    pub fn spawn<S, V>(branch: BranchId, group: GroupTag, store: S, validator: V) -> Self
    where
        S: CountStore,
        V: SaveValidator,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::idle());
        let shutdown = Arc::new(Notify::new());

        let worker = Worker {
            branch,
            group,
            store,
            validator,
            rx,
            status: status_tx,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            tx,
            status_rx,
            shutdown,
            handle,
        }
    }

    /// Queue the current full batch for a debounced save. Each call restarts
    /// the quiet window and replaces any previously pending batch.
    pub fn schedule_save(&self, batch: Vec<CyclicItem>) {
        self.send(SaveRequest {
            batch,
            immediate: false,
        });
    }

    /// Explicit user save: bypasses the debounce window (the write-start rate
    /// limit still applies).
    pub fn save_now(&self, batch: Vec<CyclicItem>) {
        self.send(SaveRequest {
            batch,
            immediate: true,
        });
    }

    /// Watch the coordinator status (state changes, completed-save counter,
    /// surfaced errors).
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status_rx.clone()
    }

    /// Session teardown: cancels a pending (not-yet-fired) scheduled save.
    /// An in-flight save cannot be cancelled; await [`join`](Self::join) to
    /// let it finish.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }

    fn send(&self, request: SaveRequest) {
        if self.tx.send(request).is_err() {
            tracing::warn!("auto-save worker is gone; batch dropped");
        }
    }
}

struct Worker<S, V> {
    branch: BranchId,
    group: GroupTag,
    store: S,
    validator: V,
    rx: mpsc::UnboundedReceiver<SaveRequest>,
    status: watch::Sender<SaveStatus>,
    shutdown: Arc<Notify>,
}

impl<S: CountStore, V: SaveValidator> Worker<S, V> {
    async fn run(mut self) {
        tracing::debug!(branch = %self.branch, group = %self.group, "auto-save worker started");

        let mut pending: Option<Vec<CyclicItem>> = None;
        let mut fire_at: Option<Instant> = None;
        let mut last_start: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    if pending.is_some() {
                        tracing::debug!("pending scheduled save cancelled on shutdown");
                    }
                    break;
                }
                request = self.rx.recv() => {
                    let Some(request) = request else { break };
                    let now = Instant::now();
                    let mut at = if request.immediate { now } else { now + DEBOUNCE };
                    // Rate limit applies to write starts, not completions.
                    if let Some(start) = last_start {
                        at = at.max(start + MIN_WRITE_INTERVAL);
                    }
                    pending = Some(request.batch);
                    fire_at = Some(at);
                    self.set_state(SaveState::Scheduled);
                }
                () = sleep_until_opt(fire_at), if fire_at.is_some() => {
                    fire_at = None;
                    let Some(batch) = pending.take() else { continue };
                    last_start = Some(Instant::now());
                    self.save(batch).await;
                }
            }
        }

        tracing::debug!(branch = %self.branch, group = %self.group, "auto-save worker stopped");
    }

    async fn save(&self, batch: Vec<CyclicItem>) {
        self.set_state(SaveState::Saving);

        if let Err(first_error) = self.validator.validate_batch(&batch) {
            // Validation failures are the user's to fix; retrying is useless.
            tracing::warn!(%first_error, "auto-save aborted by validation");
            self.fail(first_error);
            return;
        }

        let mut attempt: u32 = 0;
        loop {
            match self
                .store
                .replace_group(self.branch, &self.group, &batch)
                .await
            {
                Ok(()) => {
                    self.status.send_modify(|s| {
                        s.state = SaveState::Idle;
                        s.completed_saves += 1;
                        s.last_error = None;
                    });
                    tracing::debug!(items = batch.len(), "batch saved");
                    return;
                }
                Err(PersistenceError::Transient(reason)) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, %reason, "transient save failure, backing off");
                    self.set_state(SaveState::Retrying);
                    tokio::time::sleep(Duration::from_millis(u64::from(attempt) * 1000)).await;
                    self.set_state(SaveState::Saving);
                }
                Err(err) => {
                    tracing::error!(%err, "save failed terminally");
                    self.fail(err.to_string());
                    return;
                }
            }
        }
    }

    fn set_state(&self, state: SaveState) {
        self.status.send_modify(|s| s.state = state);
    }

    fn fail(&self, error: String) {
        self.status.send_modify(|s| {
            s.state = SaveState::Failed;
            s.last_error = Some(error);
        });
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        // Guarded by `fire_at.is_some()` in the select; never polled.
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stocktake_core::Ean;
    use stocktake_records::InventoryRecord;
    use tokio::sync::Mutex;

    struct RecordingStore {
        writes: Mutex<Vec<(Instant, Vec<CyclicItem>)>>,
        transient_failures: AtomicUsize,
        write_delay: Duration,
    }

    impl RecordingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                writes: Mutex::new(Vec::new()),
                transient_failures: AtomicUsize::new(0),
                write_delay: Duration::ZERO,
            })
        }

        fn failing(times: usize) -> Arc<Self> {
            let store = Self::new();
            store.transient_failures.store(times, Ordering::SeqCst);
            store
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                writes: Mutex::new(Vec::new()),
                transient_failures: AtomicUsize::new(0),
                write_delay: delay,
            })
        }

        async fn write_count(&self) -> usize {
            self.writes.lock().await.len()
        }
    }

    impl CountStore for Arc<RecordingStore> {
        async fn replace_group(
            &self,
            _branch: BranchId,
            _group: &GroupTag,
            batch: &[CyclicItem],
        ) -> Result<(), PersistenceError> {
            let started = Instant::now();
            if self.write_delay > Duration::ZERO {
                tokio::time::sleep(self.write_delay).await;
            }
            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(PersistenceError::Transient("connection reset".into()));
            }
            self.writes.lock().await.push((started, batch.to_vec()));
            Ok(())
        }
    }

    struct AcceptAll;
    impl SaveValidator for AcceptAll {
        fn validate_batch(&self, _batch: &[CyclicItem]) -> Result<(), String> {
            Ok(())
        }
    }

    struct RejectAll;
    impl SaveValidator for RejectAll {
        fn validate_batch(&self, _batch: &[CyclicItem]) -> Result<(), String> {
            Err("batch is empty".to_string())
        }
    }

    fn batch(counted: i64) -> Vec<CyclicItem> {
        let mut item = CyclicItem::new(InventoryRecord::new(Ean::new("100"), "Item", 10, 100));
        item.set_quantity(counted).unwrap();
        vec![item]
    }

    fn coordinator(store: Arc<RecordingStore>) -> AutoSaveCoordinator {
        AutoSaveCoordinator::spawn(
            BranchId::new(),
            GroupTag::new("analgesics"),
            store,
            AcceptAll,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn five_edits_in_the_window_produce_one_write() {
        let store = RecordingStore::new();
        let coord = coordinator(store.clone());

        for qty in 1..=5 {
            coord.schedule_save(batch(qty));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(store.write_count().await, 1);
        // Last full batch wins.
        let writes = store.writes.lock().await;
        assert_eq!(writes[0].1[0].record.counted_qty, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_save_skips_the_debounce() {
        let store = RecordingStore::new();
        let coord = coordinator(store.clone());

        coord.save_now(batch(7));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn write_starts_respect_the_rate_limit() {
        let store = RecordingStore::new();
        let coord = coordinator(store.clone());

        coord.save_now(batch(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
        coord.save_now(batch(2));
        tokio::time::sleep(Duration::from_secs(10)).await;

        let writes = store.writes.lock().await;
        assert_eq!(writes.len(), 2);
        let gap = writes[1].0 - writes[0].0;
        assert!(gap >= MIN_WRITE_INTERVAL, "write gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let store = RecordingStore::failing(2);
        let coord = coordinator(store.clone());
        let mut status = coord.status();

        coord.save_now(batch(3));
        // 2 failed attempts (1s + 2s backoff) then success.
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.write_count().await, 1);
        let s = status.borrow_and_update().clone();
        assert_eq!(s.state, SaveState::Idle);
        assert_eq!(s.completed_saves, 1);
        assert_eq!(s.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_a_terminal_error() {
        let store = RecordingStore::failing(usize::MAX);
        let coord = coordinator(store.clone());
        let mut status = coord.status();

        coord.save_now(batch(3));
        // Initial attempt + 3 retries with 1s/2s/3s backoffs.
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.write_count().await, 0);
        let s = status.borrow_and_update().clone();
        assert_eq!(s.state, SaveState::Failed);
        assert!(s.last_error.unwrap().contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_aborts_without_touching_the_store() {
        let store = RecordingStore::new();
        let coord = AutoSaveCoordinator::spawn(
            BranchId::new(),
            GroupTag::new("analgesics"),
            store.clone(),
            RejectAll,
        );
        let mut status = coord.status();

        coord.save_now(batch(3));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.write_count().await, 0);
        let s = status.borrow_and_update().clone();
        assert_eq!(s.state, SaveState::Failed);
        assert_eq!(s.last_error.as_deref(), Some("batch is empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_arriving_mid_save_goes_into_the_next_cycle() {
        let store = RecordingStore::slow(Duration::from_secs(1));
        let coord = coordinator(store.clone());

        coord.save_now(batch(1));
        // Let the write begin, then supersede while it is in flight.
        tokio::time::sleep(Duration::from_millis(500)).await;
        coord.save_now(batch(2));
        tokio::time::sleep(Duration::from_secs(10)).await;

        let writes = store.writes.lock().await;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1[0].record.counted_qty, Some(1));
        assert_eq!(writes[1].1[0].record.counted_qty, Some(2));
        let gap = writes[1].0 - writes[0].0;
        assert!(gap >= MIN_WRITE_INTERVAL, "write gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_a_pending_scheduled_save() {
        let store = RecordingStore::new();
        let coord = coordinator(store.clone());

        coord.schedule_save(batch(9));
        tokio::time::sleep(Duration::from_millis(500)).await;
        coord.shutdown();
        coord.join().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.write_count().await, 0);
    }
}
