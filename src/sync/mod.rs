//! Queue sync engine.
//!
//! Keeps a rendered queue consistent with the last published snapshot while the user
//! moves, pauses and deletes items. The snapshot in the store is always the
//! authority: optimistic local edits last only until the next render.
//!
//! Rendering is skipped entirely while the suppress-redraw flag is raised (see
//! [`reorder`]). The next render after the flag drops picks up whatever is current.

pub mod pause;
pub mod reorder;

use crate::coordinator::{Command, CommandResponse, CoordinatorHandle};
use crate::queue::{ItemStatus, QueueItem, QueueSnapshot, QueueStatus};
use crate::store::{Store, StoreResult, keys};
use pause::{PauseControl, PauseDuration, QueueState};
use std::time::Duration;

/// Toggle shown on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowToggle {
    Pause,
    Resume,
}

/// One rendered queue row. Every row can also be deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub id: String,
    pub filename: String,
    pub status: ItemStatus,
    pub percentage: u8,
    pub toggle: RowToggle,
    /// Progress bar is drawn only once something has downloaded
    pub show_progress: bool,
    pub timeleft: String,
    pub mb: f64,
}

impl From<&QueueItem> for RenderedRow {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id.clone(),
            filename: item.filename.clone(),
            status: item.status.clone(),
            percentage: item.percentage,
            toggle: if item.is_paused() {
                RowToggle::Resume
            } else {
                RowToggle::Pause
            },
            show_progress: item.percentage != 0,
            timeleft: item.timeleft.clone(),
            mb: item.mb,
        }
    }
}

/// Everything the popup draws, derived from store contents only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueView {
    pub rows: Vec<RenderedRow>,
    pub status: QueueStatus,
    pub paused: bool,
    pub timeleft: String,
    pub speed: String,
    pub sizeleft: String,
    pub paused_jobs: usize,
    pub pause_int: String,
    pub speedlimit: String,
    /// Error banner; `None` when the last refresh succeeded
    pub error: Option<String>,
    pub speedlog: Vec<f64>,
}

impl QueueView {
    pub fn build(snapshot: &QueueSnapshot, error: Option<String>, speedlog: Vec<f64>) -> Self {
        Self {
            rows: snapshot.items.iter().map(RenderedRow::from).collect(),
            status: snapshot.status,
            paused: snapshot.paused,
            timeleft: snapshot.timeleft.clone(),
            speed: snapshot.speed.clone(),
            sizeleft: snapshot.sizeleft.clone(),
            paused_jobs: snapshot.paused_jobs,
            pause_int: snapshot.pause_int.clone(),
            speedlimit: snapshot.speedlimit.clone(),
            error: error.filter(|e| !e.is_empty()),
            speedlog,
        }
    }

    /// Read the store and build a view
    pub async fn load(store: &Store) -> Self {
        let snapshot = QueueSnapshot::load(store).await;
        let error = store.get_string(keys::ERROR).await;
        let speedlog = store.get(keys::SPEEDLOG).await.unwrap_or_default();
        Self::build(&snapshot, error, speedlog)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    pub fn queue_state(&self) -> QueueState {
        QueueState::from_snapshot(self.paused, &self.pause_int)
    }
}

/// Outcome of a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// A move gesture is in progress; the previous view was kept
    Suppressed,
}

/// Per-row actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Pause,
    Resume,
    Delete,
}

impl ItemAction {
    fn command(self, nzo_id: String) -> Command {
        match self {
            Self::Pause => Command::PauseDownload { nzo_id },
            Self::Resume => Command::ResumeDownload { nzo_id },
            Self::Delete => Command::RemoveDownload { nzo_id },
        }
    }
}

/// Outcome of ending a move gesture
#[derive(Debug, Clone, PartialEq)]
pub enum ReorderOutcome {
    /// No gesture was active for this item
    NotActive,
    /// The item ended where it started; nothing was sent
    Unchanged,
    /// A move was sent to the coordinator
    Moved {
        position: usize,
        response: CommandResponse,
    },
}

#[derive(Debug, Clone)]
struct Gesture {
    id: String,
    start: usize,
}

/// Reconciles the rendered queue with the store and forwards user actions
pub struct QueueSyncEngine {
    store: Store,
    coordinator: CoordinatorHandle,
    suppress_bound: Duration,
    view: QueueView,
    gesture: Option<Gesture>,
    control: PauseControl,
    last_known_paused: Option<bool>,
    control_rebuilds: u64,
}

impl QueueSyncEngine {
    pub fn new(store: Store, coordinator: CoordinatorHandle, suppress_bound: Duration) -> Self {
        Self {
            store,
            coordinator,
            suppress_bound,
            view: QueueView::default(),
            gesture: None,
            control: PauseControl::for_state(QueueState::Running),
            last_known_paused: None,
            control_rebuilds: 0,
        }
    }

    pub fn view(&self) -> &QueueView {
        &self.view
    }

    pub fn pause_control(&self) -> &PauseControl {
        &self.control
    }

    pub fn pause_control_mut(&mut self) -> &mut PauseControl {
        &mut self.control
    }

    /// Paused state seen at the last render; `None` before the first one
    pub fn last_known_paused(&self) -> Option<bool> {
        self.last_known_paused
    }

    /// How many times the pause control has been rebuilt
    pub fn control_rebuilds(&self) -> u64 {
        self.control_rebuilds
    }

    pub fn reorder_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Rebuild the view from the store unless a move gesture suppresses refreshes
    pub async fn render(&mut self) -> RenderOutcome {
        if reorder::is_suppressed(&self.store).await {
            tracing::trace!("Render skipped: reorder in progress");
            return RenderOutcome::Suppressed;
        }

        self.view = QueueView::load(&self.store).await;
        self.sync_pause_control();
        RenderOutcome::Rendered
    }

    fn sync_pause_control(&mut self) {
        let paused = self.view.paused;
        if self.last_known_paused != Some(paused) {
            self.control = PauseControl::for_state(self.view.queue_state());
            self.last_known_paused = Some(paused);
            self.control_rebuilds += 1;
            tracing::debug!("Pause control rebuilt (paused: {})", paused);
        } else if let QueueState::Paused(_) = self.control.state {
            // Remaining time changes while paused; the control shape does not.
            self.control.state = self.view.queue_state();
        }
    }

    /// Start a move gesture on an item. Returns `false` if the item is not shown.
    pub async fn begin_reorder(&mut self, id: &str) -> StoreResult<bool> {
        let Some(start) = self.view.position_of(id) else {
            return Ok(false);
        };
        if let Some(previous) = &self.gesture {
            tracing::warn!("Move gesture on '{}' replaced by '{}'", previous.id, id);
        }

        self.gesture = Some(Gesture {
            id: id.to_string(),
            start,
        });
        reorder::suppress(&self.store, self.suppress_bound).await?;
        tracing::debug!("Move gesture started on '{}' at {}", id, start);
        Ok(true)
    }

    /// Move the gesture's item by `delta` rows in the local view
    pub fn move_during_reorder(&mut self, delta: isize) -> Option<usize> {
        let gesture = self.gesture.as_ref()?;
        let from = self.view.position_of(&gesture.id)?;
        let last = self.view.rows.len().checked_sub(1)?;
        let to = from.saturating_add_signed(delta).min(last);
        if to != from {
            let row = self.view.rows.remove(from);
            self.view.rows.insert(to, row);
        }
        Some(to)
    }

    /// End the move gesture. The flag is always lowered first and the gesture
    /// dropped; a move is sent only when `id` was the gesture's item and its
    /// position changed.
    pub async fn end_reorder(&mut self, id: &str) -> ReorderOutcome {
        if let Err(e) = reorder::release(&self.store).await {
            tracing::error!("Failed to clear skip_redraw: {}", e);
        }

        let gesture = match self.gesture.take() {
            Some(gesture) if gesture.id == id => gesture,
            Some(gesture) => {
                tracing::warn!("Move gesture on '{}' ended as '{}', dropped", gesture.id, id);
                self.render().await;
                return ReorderOutcome::NotActive;
            }
            None => return ReorderOutcome::NotActive,
        };

        let Some(position) = self.view.position_of(id) else {
            self.render().await;
            return ReorderOutcome::NotActive;
        };

        if position == gesture.start {
            tracing::debug!("'{}' dropped at its start position, nothing to send", id);
            self.render().await;
            return ReorderOutcome::Unchanged;
        }

        let response = self
            .coordinator
            .send(Command::MoveItem {
                nzo_id: id.to_string(),
                position,
            })
            .await;
        self.note_failure(&response).await;
        self.render().await;
        ReorderOutcome::Moved { position, response }
    }

    /// Drop a gesture without sending anything (surface closing, escape key)
    pub async fn cancel_reorder(&mut self) {
        self.gesture = None;
        if let Err(e) = reorder::release(&self.store).await {
            tracing::error!("Failed to clear skip_redraw: {}", e);
        }
        self.render().await;
    }

    /// Apply a row action optimistically, send it, then re-render from the store
    pub async fn apply_action(&mut self, action: ItemAction, id: &str) -> CommandResponse {
        if let Some(index) = self.view.position_of(id) {
            match action {
                ItemAction::Delete => {
                    self.view.rows.remove(index);
                }
                ItemAction::Pause => {
                    let row = &mut self.view.rows[index];
                    row.status = ItemStatus::Paused;
                    row.toggle = RowToggle::Resume;
                }
                ItemAction::Resume => {
                    let row = &mut self.view.rows[index];
                    row.status = ItemStatus::Queued;
                    row.toggle = RowToggle::Pause;
                }
            }
        }

        let response = self.coordinator.send(action.command(id.to_string())).await;
        self.note_failure(&response).await;
        self.render().await;
        response
    }

    /// Pause the whole queue
    pub async fn pause_queue(&mut self, duration: PauseDuration) -> CommandResponse {
        let response = self
            .coordinator
            .send(Command::PauseQueue {
                duration: duration.minutes(),
            })
            .await;
        self.note_failure(&response).await;
        self.render().await;
        response
    }

    pub async fn resume_queue(&mut self) -> CommandResponse {
        let response = self.coordinator.send(Command::ResumeQueue).await;
        self.note_failure(&response).await;
        self.render().await;
        response
    }

    pub async fn set_speed_limit(&mut self, speed: &str) -> CommandResponse {
        let response = self
            .coordinator
            .send(Command::SetSpeedLimit {
                speed: speed.to_string(),
            })
            .await;
        self.note_failure(&response).await;
        self.render().await;
        response
    }

    /// Ask the coordinator for a fresh fetch, then render
    pub async fn refresh(&mut self) -> CommandResponse {
        let response = self.coordinator.send(Command::RefreshData).await;
        self.render().await;
        response
    }

    /// Put a failed command's message on the banner. It stays until the next
    /// successful fetch clears `error`.
    async fn note_failure(&self, response: &CommandResponse) {
        if response.is_success() {
            return;
        }
        let message = response.error_message();
        tracing::warn!("Command failed: {}", message);
        if let Err(e) = self.store.set(keys::ERROR, message).await {
            tracing::error!("Failed to record error banner: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Request;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Coordinator stand-in that records commands and answers with `reply`
    fn fake_coordinator(
        reply: CommandResponse,
    ) -> (CoordinatorHandle, Arc<Mutex<Vec<Command>>>) {
        let (sender, mut receiver) = mpsc::channel::<Request>(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                log.lock().unwrap().push(request.command);
                let _ = request.reply.send(reply.clone());
            }
        });
        (CoordinatorHandle::new(sender), seen)
    }

    async fn seeded_store(ids: &[&str]) -> Store {
        let store = Store::in_memory();
        let slots: Vec<_> = ids
            .iter()
            .map(|id| json!({"nzo_id": id, "filename": format!("{id}.nzb"), "status": "Queued", "percentage": 0}))
            .collect();
        store
            .set_many([
                (keys::QUEUE, json!(serde_json::to_string(&slots).unwrap())),
                (keys::PAUSED, json!(false)),
            ])
            .await
            .unwrap();
        store
    }

    fn engine(store: &Store, reply: CommandResponse) -> (QueueSyncEngine, Arc<Mutex<Vec<Command>>>) {
        let (handle, seen) = fake_coordinator(reply);
        (
            QueueSyncEngine::new(store.clone(), handle, Duration::from_secs(30)),
            seen,
        )
    }

    fn ids(engine: &QueueSyncEngine) -> Vec<String> {
        engine.view().rows.iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_render_twice_is_identical() {
        let store = seeded_store(&["A", "B", "C"]).await;
        let (mut engine, _) = engine(&store, CommandResponse::ok());

        engine.render().await;
        let first = engine.view().clone();
        engine.render().await;

        assert_eq!(engine.view(), &first);
        assert_eq!(ids(&engine), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_flag_raised_only_during_gesture() {
        let store = seeded_store(&["A", "B", "C"]).await;
        let (mut engine, _) = engine(&store, CommandResponse::ok());
        engine.render().await;

        for _ in 0..3 {
            assert!(!store.get_flag(keys::SKIP_REDRAW).await);
            assert!(engine.begin_reorder("B").await.unwrap());
            assert!(store.get_flag(keys::SKIP_REDRAW).await);
            engine.end_reorder("B").await;
            assert!(!store.get_flag(keys::SKIP_REDRAW).await);
        }
    }

    #[tokio::test]
    async fn test_render_is_skipped_while_suppressed() {
        let store = seeded_store(&["A", "B"]).await;
        let (mut engine, _) = engine(&store, CommandResponse::ok());
        engine.render().await;

        engine.begin_reorder("A").await.unwrap();
        store
            .set(keys::QUEUE, serde_json::to_string(&json!([])).unwrap())
            .await
            .unwrap();

        assert_eq!(engine.render().await, RenderOutcome::Suppressed);
        assert_eq!(ids(&engine), vec!["A", "B"]);

        engine.end_reorder("A").await;
        assert!(engine.view().rows.is_empty());
    }

    #[tokio::test]
    async fn test_reorder_to_same_position_sends_nothing() {
        let store = seeded_store(&["A", "B", "C"]).await;
        let (mut engine, seen) = engine(&store, CommandResponse::ok());
        engine.render().await;

        engine.begin_reorder("B").await.unwrap();
        engine.move_during_reorder(1);
        engine.move_during_reorder(-1);
        let outcome = engine.end_reorder("B").await;

        assert_eq!(outcome, ReorderOutcome::Unchanged);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_to_new_position_sends_one_move() {
        let store = seeded_store(&["A", "B", "C"]).await;
        let (mut engine, seen) = engine(&store, CommandResponse::ok());
        engine.render().await;

        engine.begin_reorder("A").await.unwrap();
        assert_eq!(engine.move_during_reorder(5), Some(2));
        let outcome = engine.end_reorder("A").await;

        assert!(matches!(outcome, ReorderOutcome::Moved { position: 2, .. }));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Command::MoveItem { nzo_id: "A".into(), position: 2 }]
        );
    }

    #[tokio::test]
    async fn test_end_without_begin_still_clears_flag() {
        let store = seeded_store(&["A"]).await;
        let (mut engine, seen) = engine(&store, CommandResponse::ok());
        reorder::suppress(&store, Duration::from_secs(30)).await.unwrap();

        assert_eq!(engine.end_reorder("A").await, ReorderOutcome::NotActive);
        assert!(!store.get_flag(keys::SKIP_REDRAW).await);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_for_other_item_drops_gesture() {
        let store = seeded_store(&["A", "B", "C"]).await;
        let (mut engine, seen) = engine(&store, CommandResponse::ok());
        engine.render().await;

        engine.begin_reorder("A").await.unwrap();
        engine.move_during_reorder(2);
        assert_eq!(engine.end_reorder("B").await, ReorderOutcome::NotActive);

        assert!(!engine.reorder_active());
        assert!(!store.get_flag(keys::SKIP_REDRAW).await);
        assert_eq!(ids(&engine), vec!["A", "B", "C"]);
        assert_eq!(engine.end_reorder("A").await, ReorderOutcome::NotActive);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_sets_banner_and_rerenders_from_snapshot() {
        let store = seeded_store(&["A", "B"]).await;
        let (mut engine, seen) = engine(&store, CommandResponse::failure("Connection failed: boom"));
        engine.render().await;

        let response = engine.apply_action(ItemAction::Delete, "A").await;

        assert!(!response.is_success());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Command::RemoveDownload { nzo_id: "A".into() }]
        );
        assert_eq!(engine.view().error.as_deref(), Some("Connection failed: boom"));
        assert_eq!(ids(&engine), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_row_toggle_follows_status() {
        let store = Store::in_memory();
        store
            .set(
                keys::QUEUE,
                json!([{"nzo_id": "A", "status": "Paused", "percentage": 0},
                       {"nzo_id": "B", "status": "Downloading", "percentage": 42}])
                .to_string(),
            )
            .await
            .unwrap();
        let (mut engine, _) = engine(&store, CommandResponse::ok());
        engine.render().await;

        let rows = &engine.view().rows;
        assert_eq!(rows[0].toggle, RowToggle::Resume);
        assert!(!rows[0].show_progress);
        assert_eq!(rows[1].toggle, RowToggle::Pause);
        assert!(rows[1].show_progress);
    }

    #[tokio::test]
    async fn test_pause_control_rebuilt_only_on_change() {
        let store = seeded_store(&["A"]).await;
        let (mut engine, _) = engine(&store, CommandResponse::ok());
        assert_eq!(engine.last_known_paused(), None);

        engine.render().await;
        engine.render().await;
        assert_eq!(engine.control_rebuilds(), 1);
        assert_eq!(engine.pause_control().label(), "Pause");

        store.set(keys::PAUSED, true).await.unwrap();
        engine.render().await;
        assert_eq!(engine.control_rebuilds(), 2);
        assert_eq!(engine.last_known_paused(), Some(true));
        assert_eq!(engine.pause_control().label(), "Resume");
        assert_eq!(engine.pause_control().selector, None);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_renders_empty() {
        let store = Store::in_memory();
        store.set(keys::QUEUE, "[{broken").await.unwrap();
        let (mut engine, _) = engine(&store, CommandResponse::ok());

        assert_eq!(engine.render().await, RenderOutcome::Rendered);
        assert!(engine.view().rows.is_empty());
    }
}
