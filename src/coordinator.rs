//! # Room coordinator
//!
//! ## Responsibility
//! Drives one room view through a conversation round:
//!
//! ```text
//!            submit (flag acquired)           response ok / conflict
//!   Idle ───────────────────────────► Submitting ─────────────────────► Polling
//!    ▲                                     │                              │  │
//!    │            other error (flag released)                             │  │ authoritative
//!    ├─────────────────────────────────────┘                              │  │ flag still true:
//!    │                                                                    │  │ refresh history
//!    │      authoritative flag false: full refresh, flag released         │  ◄┘
//!    └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The server never pushes completion, so while a round runs the coordinator
//! re-fetches the room every `poll_interval` until the server's
//! `isProcessing` flag drops.
//!
//! ## Guarantees
//! - At most one question request per acquired flag; concurrent submissions
//!   anywhere in the process are rejected locally with
//!   [`RoundtableError::Busy`].
//! - The completion refresh (history, room, statistics) runs exactly once per
//!   round and the poll task ends with it.
//! - [`stop_polling`](RoomCoordinator::stop_polling) and dropping the
//!   coordinator cancel the poll task with no later side effects. Neither
//!   touches the shared flag, which may belong to a round started from
//!   another view.
//! - A room switch stops the view's poll task too. When the view was polling
//!   its own round (or is still submitting it), a detached watcher keeps
//!   fetching the old room and releases the shared flag once that round ends.
//!   It updates nothing else.
//! - A question request that times out after being sent counts as a running
//!   round: the view polls and the server's flag decides.
//!
//! ## NOT Responsible For
//! - Rendering: views observe [`RoomEvent`]s or read [`RoomView`] snapshots.
//! - Timeouts: a server that never clears its flag is polled indefinitely.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{ChatApi, ConversationRequest, HistoryEntry, Room, Statistics};
use crate::config::ClientConfig;
use crate::error::RoundtableError;
use crate::processing::ProcessingStore;
use crate::roles::RoleSelection;

/// Capacity of each coordinator's event channel.
pub const EVENT_CHANNEL_CAP: usize = 256;

/// Consecutive poll failures after which logging escalates to `error`.
const FAILURE_ESCALATION: u32 = 5;

// ---------------------------------------------------------------------------
// State machine types
// ---------------------------------------------------------------------------

/// Where a room view is in the round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomPhase {
    /// No round pending; submission enabled unless another view holds the
    /// shared flag.
    #[default]
    Idle,
    /// The question request is in flight.
    Submitting,
    /// Waiting for the server's flag to drop.
    Polling,
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoomPhase::Idle => "idle",
            RoomPhase::Submitting => "submitting",
            RoomPhase::Polling => "polling",
        };
        write!(f, "{s}")
    }
}

/// What a poll tick does with the authoritative flag it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Round still running: refresh history only.
    KeepPolling,
    /// Round finished: full refresh, release the flag, stop.
    Complete,
}

pub fn poll_step(authoritative_processing: bool) -> PollStep {
    if authoritative_processing {
        PollStep::KeepPolling
    } else {
        PollStep::Complete
    }
}

/// How a failed question request affects the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitFailure {
    /// A round is (or may be) running server-side: keep the flag, poll. Covers
    /// explicit conflicts and requests that timed out after being sent.
    Conflict,
    /// Anything else: release the flag, back to idle.
    Fatal,
}

pub fn classify_submit_error(err: &RoundtableError, conflict_phrases: &[String]) -> SubmitFailure {
    if err.is_conflict(conflict_phrases) || err.is_timeout() {
        SubmitFailure::Conflict
    } else {
        SubmitFailure::Fatal
    }
}

/// Result of an accepted [`RoomCoordinator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server took the question; `note` is the note content it returned.
    Accepted { note: Option<String> },
    /// The server reported a round already in progress; the view polls it.
    AlreadyProcessing,
}

/// Notifications for whoever renders the room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    RoomLoaded(Room),
    HistoryRefreshed(Vec<HistoryEntry>),
    StatisticsRefreshed(Statistics),
    NoteAdopted(String),
    PhaseChanged(RoomPhase),
    RoundCompleted,
    /// Alert-level text for a failed submission.
    SubmitFailed(String),
    /// Transient poll failure; polling continues.
    PollFailed(String),
}

/// Snapshot of everything a room view shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomView {
    pub room_id: u64,
    pub room: Option<Room>,
    pub history: Vec<HistoryEntry>,
    pub statistics: Option<Statistics>,
    pub note: String,
    /// Question being typed; cleared when a submission is accepted.
    pub draft: String,
    pub phase: RoomPhase,
    /// Local mirror of this room's authoritative flag.
    pub room_processing: bool,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct ViewState {
    view: RoomView,
    /// Bumped whenever the poll task is cancelled or the room changes; work
    /// finished under an older epoch is discarded.
    epoch: u64,
}

struct Shared {
    api: Arc<dyn ChatApi>,
    store: ProcessingStore,
    config: ClientConfig,
    state: Mutex<ViewState>,
    events: broadcast::Sender<RoomEvent>,
    phase_tx: watch::Sender<RoomPhase>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: RoomEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn current(&self) -> (u64, u64) {
        let st = self.lock();
        (st.view.room_id, st.epoch)
    }

    /// Apply `f` to the view unless `epoch` is stale. Returns whether it ran.
    fn update<F: FnOnce(&mut RoomView)>(&self, epoch: u64, f: F) -> bool {
        let mut st = self.lock();
        if st.epoch != epoch {
            return false;
        }
        f(&mut st.view);
        true
    }

    fn set_phase(&self, epoch: u64, phase: RoomPhase) -> bool {
        let applied = self.update(epoch, |v| v.phase = phase);
        if applied {
            self.phase_tx.send_replace(phase);
            self.emit(RoomEvent::PhaseChanged(phase));
        }
        applied
    }

    fn apply_room(&self, epoch: u64, room: Room) {
        let applied = self.update(epoch, |v| {
            v.note = room.note.clone().unwrap_or_default();
            v.room = Some(room.clone());
        });
        if applied {
            self.emit(RoomEvent::RoomLoaded(room));
        }
    }

    fn apply_history(&self, epoch: u64, history: Vec<HistoryEntry>) {
        let applied = self.update(epoch, |v| v.history = history.clone());
        if applied {
            self.emit(RoomEvent::HistoryRefreshed(history));
        }
    }

    fn apply_statistics(&self, epoch: u64, stats: Statistics) {
        let applied = self.update(epoch, |v| v.statistics = Some(stats.clone()));
        if applied {
            self.emit(RoomEvent::StatisticsRefreshed(stats));
        }
    }

    /// Parallel refresh of history, room and statistics.
    ///
    /// Failures are logged and leave the previous values in place.
    async fn refresh_all(&self, room_id: u64, epoch: u64) {
        let (history, room, stats) = tokio::join!(
            self.api.get_history(room_id),
            self.api.get_room(room_id),
            self.api.get_statistics(room_id),
        );
        match history {
            Ok(h) => self.apply_history(epoch, h),
            Err(e) => warn!(room_id, error = %e, "history refresh failed"),
        }
        match room {
            Ok(r) => self.apply_room(epoch, r),
            Err(e) => warn!(room_id, error = %e, "room refresh failed"),
        }
        match stats {
            Ok(s) => self.apply_statistics(epoch, s),
            Err(e) => warn!(room_id, error = %e, "statistics refresh failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomCoordinator
// ---------------------------------------------------------------------------

/// Coordinates submission and completion tracking for one room view.
///
/// Create one per open view; give all of them clones of the same
/// [`ProcessingStore`] and API handle.
///
/// # Example
/// ```rust,ignore
/// let store = ProcessingStore::new();
/// let room = RoomCoordinator::new(api.clone(), store.clone(), 42, config.clone());
/// room.open().await?;
/// room.submit("How should we price this?", &RoleSelection::default(), 2).await?;
/// room.wait_for_completion().await;
/// ```
pub struct RoomCoordinator {
    shared: Arc<Shared>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl RoomCoordinator {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: ProcessingStore,
        room_id: u64,
        config: ClientConfig,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAP);
        let (phase_tx, _phase_rx) = watch::channel(RoomPhase::Idle);
        let shared = Arc::new(Shared {
            api,
            store,
            config,
            state: Mutex::new(ViewState {
                view: RoomView {
                    room_id,
                    ..Default::default()
                },
                epoch: 0,
            }),
            events,
            phase_tx,
        });
        Self {
            shared,
            poller: Mutex::new(None),
        }
    }

    pub fn room_id(&self) -> u64 {
        self.shared.lock().view.room_id
    }

    pub fn phase(&self) -> RoomPhase {
        self.shared.lock().view.phase
    }

    /// Copy of the current view.
    pub fn view(&self) -> RoomView {
        self.shared.lock().view.clone()
    }

    pub fn store(&self) -> &ProcessingStore {
        &self.shared.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.shared.events.subscribe()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.phase() == RoomPhase::Idle && !self.shared.store.get()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.lock().view.draft = text;
    }

    pub fn draft(&self) -> String {
        self.shared.lock().view.draft.clone()
    }

    /// Load room, history and statistics in parallel.
    ///
    /// When the server reports a round in progress, the shared flag is raised
    /// and the view starts polling.
    ///
    /// # Errors
    /// The room fetch error; history and statistics failures are only logged.
    pub async fn open(&self) -> Result<Room, RoundtableError> {
        let (room_id, epoch) = self.shared.current();
        let (room, history, stats) = tokio::join!(
            self.shared.api.get_room(room_id),
            self.shared.api.get_history(room_id),
            self.shared.api.get_statistics(room_id),
        );

        let room = room.map_err(|e| {
            warn!(room_id, error = %e, "failed to load room");
            e
        })?;
        self.shared.apply_room(epoch, room.clone());
        match history {
            Ok(h) => self.shared.apply_history(epoch, h),
            Err(e) => warn!(room_id, error = %e, "failed to load history"),
        }
        match stats {
            Ok(s) => self.shared.apply_statistics(epoch, s),
            Err(e) => warn!(room_id, error = %e, "failed to load statistics"),
        }

        if room.is_processing && self.shared.update(epoch, |v| v.room_processing = true) {
            info!(room_id, "server reports a round in progress, resuming polling");
            self.shared.store.mark_busy();
            self.start_polling();
        }
        Ok(room)
    }

    /// Switch this view to another room.
    ///
    /// The old room's poll task is cancelled. If it was tracking this view's
    /// round, the old room is handed to a detached watcher that releases the
    /// shared flag when the round ends.
    pub async fn select_room(&self, room_id: u64) -> Result<Room, RoundtableError> {
        let abandoned = {
            let st = self.shared.lock();
            (st.view.phase == RoomPhase::Polling && st.view.room_processing)
                .then_some(st.view.room_id)
        };
        self.stop_polling();
        if let Some(old_room) = abandoned {
            self.hand_off(old_room);
        }
        {
            let mut st = self.shared.lock();
            st.epoch += 1;
            st.view = RoomView {
                room_id,
                ..Default::default()
            };
        }
        self.shared.phase_tx.send_replace(RoomPhase::Idle);
        self.shared.emit(RoomEvent::PhaseChanged(RoomPhase::Idle));
        self.open().await
    }

    /// Submit `question` to `roles` for up to `rounds` rounds.
    ///
    /// # Returns
    /// - `Ok(SubmitOutcome::Accepted)`: the server took the question; the
    ///   view is polling.
    /// - `Ok(SubmitOutcome::AlreadyProcessing)`: the server reported a round
    ///   already running; the view is polling and the flag stays raised.
    ///
    /// # Errors
    /// - [`RoundtableError::EmptyQuestion`], [`RoundtableError::NoRolesSelected`],
    ///   [`RoundtableError::Busy`]: rejected locally, nothing was sent.
    /// - Any other request error; the flag is released and the view is idle.
    pub async fn submit(
        &self,
        question: &str,
        roles: &RoleSelection,
        rounds: u32,
    ) -> Result<SubmitOutcome, RoundtableError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RoundtableError::EmptyQuestion);
        }
        if roles.is_empty() {
            return Err(RoundtableError::NoRolesSelected);
        }
        let rounds = self.shared.config.clamp_rounds(rounds);

        if !self.shared.store.try_acquire() {
            debug!(room_id = self.room_id(), "submission rejected, round already in flight");
            return Err(RoundtableError::Busy);
        }

        let (room_id, epoch) = self.shared.current();
        self.shared.update(epoch, |v| v.room_processing = true);
        self.shared.set_phase(epoch, RoomPhase::Submitting);

        let request = ConversationRequest {
            chat_room_id: Some(room_id),
            question: question.to_string(),
            prompt_keys: roles.keys().to_vec(),
            conversation_rounds: rounds,
        };
        info!(room_id, roles = %roles, rounds, "submitting question");

        match self.shared.api.send_question(&request).await {
            Ok(resp) => {
                let note = resp.note_content().map(str::to_string);
                let applied = self.shared.update(epoch, |v| {
                    if let Some(n) = &note {
                        v.note = n.clone();
                    }
                    v.draft.clear();
                });
                if applied {
                    if let Some(n) = &note {
                        self.shared.emit(RoomEvent::NoteAdopted(n.clone()));
                    }
                    self.start_polling();
                } else {
                    // The view moved on while the request was in flight.
                    self.hand_off(room_id);
                }
                Ok(SubmitOutcome::Accepted { note })
            }
            Err(e) => match classify_submit_error(&e, &self.shared.config.conflict_phrases) {
                SubmitFailure::Conflict => {
                    warn!(room_id, error = %e, "round may already be in progress, polling");
                    if self.shared.lock().epoch == epoch {
                        self.start_polling();
                    } else {
                        self.hand_off(room_id);
                    }
                    Ok(SubmitOutcome::AlreadyProcessing)
                }
                SubmitFailure::Fatal => {
                    error!(room_id, error = %e, "question submission failed");
                    self.shared.store.release();
                    self.shared.update(epoch, |v| v.room_processing = false);
                    self.shared.set_phase(epoch, RoomPhase::Idle);
                    self.shared.emit(RoomEvent::SubmitFailed(e.user_message()));
                    Err(e)
                }
            },
        }
    }

    /// Submit the current draft.
    pub async fn submit_draft(
        &self,
        roles: &RoleSelection,
        rounds: u32,
    ) -> Result<SubmitOutcome, RoundtableError> {
        let draft = self.draft();
        self.submit(&draft, roles, rounds).await
    }

    /// Resolve when the view is back to [`RoomPhase::Idle`].
    pub async fn wait_for_completion(&self) {
        let mut rx = self.shared.phase_tx.subscribe();
        // The sender lives in `shared`, which outlives this borrow.
        let _ = rx.wait_for(|p| *p == RoomPhase::Idle).await;
    }

    /// Re-fetch history, room and statistics.
    pub async fn refresh(&self) {
        let (room_id, epoch) = self.shared.current();
        self.shared.refresh_all(room_id, epoch).await;
    }

    pub async fn save_note(&self, note: &str) -> Result<Room, RoundtableError> {
        let (room_id, epoch) = self.shared.current();
        let room = self.shared.api.update_note(room_id, note).await?;
        self.shared.apply_room(epoch, room.clone());
        self.shared.update(epoch, |v| v.note = note.to_string());
        Ok(room)
    }

    pub async fn rename(&self, title: &str) -> Result<Room, RoundtableError> {
        let (room_id, epoch) = self.shared.current();
        let room = self.shared.api.update_title(room_id, title).await?;
        self.shared.apply_room(epoch, room.clone());
        Ok(room)
    }

    /// Whether a poll task is alive.
    pub fn is_polling(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Cancel the poll task. Leaves the phase and the shared flag untouched.
    pub fn stop_polling(&self) {
        self.shared.lock().epoch += 1;
        if let Some(handle) = self.lock_poller().take() {
            handle.abort();
            debug!(room_id = self.room_id(), "polling stopped");
        }
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_polling(&self) {
        let (room_id, epoch) = self.shared.current();
        self.shared.set_phase(epoch, RoomPhase::Polling);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(poll_until_complete(shared, room_id, epoch));
        if let Some(old) = self.lock_poller().replace(handle) {
            old.abort();
        }
        debug!(room_id, "polling started");
    }

    /// Keep watching `room_id` after this view has left it.
    fn hand_off(&self, room_id: u64) {
        info!(room_id, "view left a running round, watching it in the background");
        tokio::spawn(release_when_idle(Arc::clone(&self.shared), room_id));
    }
}

impl Drop for RoomCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_poller().take() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Poll the room's authoritative flag until it drops.
///
/// The first tick fires one `poll_interval` after start. A tick that finds the
/// shared flag down ends the loop without a fetch. Fetch failures are
/// transient: logged, reported as [`RoomEvent::PollFailed`], retried on the
/// next tick with no attempt ceiling.
async fn poll_until_complete(shared: Arc<Shared>, room_id: u64, epoch: u64) {
    let period = effective_period(shared.config.poll_interval);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut consecutive_failures: u32 = 0;

    loop {
        ticker.tick().await;

        if !shared.store.get() {
            // The flag was released elsewhere; polling only runs while it is up.
            if shared.update(epoch, |v| v.room_processing = false) {
                debug!(room_id, "processing flag down, polling ends");
                shared.set_phase(epoch, RoomPhase::Idle);
            }
            return;
        }

        let room = match shared.api.get_room(room_id).await {
            Ok(room) => {
                consecutive_failures = 0;
                room
            }
            Err(e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                if consecutive_failures >= FAILURE_ESCALATION {
                    error!(
                        room_id,
                        error = %e,
                        consecutive_failures,
                        "room poll failed repeatedly, will retry next tick"
                    );
                } else {
                    warn!(room_id, error = %e, "room poll failed, will retry next tick");
                }
                if shared.lock().epoch == epoch {
                    shared.emit(RoomEvent::PollFailed(e.to_string()));
                }
                continue;
            }
        };

        match poll_step(room.is_processing) {
            PollStep::KeepPolling => {
                if shared.lock().epoch != epoch {
                    return;
                }
                match shared.api.get_history(room_id).await {
                    Ok(h) => shared.apply_history(epoch, h),
                    Err(e) => warn!(room_id, error = %e, "history refresh failed"),
                }
            }
            PollStep::Complete => {
                shared.refresh_all(room_id, epoch).await;
                if !shared.update(epoch, |v| v.room_processing = false) {
                    return;
                }
                shared.store.release();
                shared.set_phase(epoch, RoomPhase::Idle);
                shared.emit(RoomEvent::RoundCompleted);
                info!(room_id, "round completed");
                return;
            }
        }
    }
}

/// Release the shared flag once `room_id` reports no round running.
///
/// Runs detached from any view: it emits no events and writes nothing but the
/// flag. Ends early when the flag is already down.
async fn release_when_idle(shared: Arc<Shared>, room_id: u64) {
    let period = effective_period(shared.config.poll_interval);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if !shared.store.get() {
            return;
        }
        match shared.api.get_room(room_id).await {
            Ok(room) if room.is_processing => {}
            Ok(_) => {
                shared.store.release();
                info!(room_id, "background round finished, processing flag released");
                return;
            }
            Err(e) => warn!(room_id, error = %e, "background room poll failed, will retry next tick"),
        }
    }
}

// tokio::time::interval panics on a zero period.
fn effective_period(period: Duration) -> Duration {
    period.max(Duration::from_millis(1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorBody;

    fn phrases() -> Vec<String> {
        ClientConfig::default().conflict_phrases
    }

    #[test]
    fn poll_step_follows_authoritative_flag() {
        assert_eq!(poll_step(true), PollStep::KeepPolling);
        assert_eq!(poll_step(false), PollStep::Complete);
    }

    #[test]
    fn classify_conflict_status() {
        let err = RoundtableError::Api {
            status: 409,
            url: "u".to_string(),
            body: None,
        };
        assert_eq!(classify_submit_error(&err, &phrases()), SubmitFailure::Conflict);
    }

    #[test]
    fn classify_conflict_phrase() {
        let err = RoundtableError::Api {
            status: 400,
            url: "u".to_string(),
            body: Some(ErrorBody {
                error: Some("이미 처리 중인 요청이 있습니다".to_string()),
                ..Default::default()
            }),
        };
        assert_eq!(classify_submit_error(&err, &phrases()), SubmitFailure::Conflict);
    }

    #[test]
    fn classify_timeout_after_send_as_conflict() {
        let err = RoundtableError::Timeout {
            url: "http://x/gpt/question".to_string(),
        };
        assert_eq!(classify_submit_error(&err, &phrases()), SubmitFailure::Conflict);
    }

    #[test]
    fn classify_other_errors_fatal() {
        let err = RoundtableError::Api {
            status: 500,
            url: "u".to_string(),
            body: None,
        };
        assert_eq!(classify_submit_error(&err, &phrases()), SubmitFailure::Fatal);
        let err = RoundtableError::Connect {
            url: "u".to_string(),
            detail: "refused".to_string(),
        };
        assert_eq!(classify_submit_error(&err, &phrases()), SubmitFailure::Fatal);
    }

    #[test]
    fn phase_display() {
        assert_eq!(RoomPhase::Idle.to_string(), "idle");
        assert_eq!(RoomPhase::Submitting.to_string(), "submitting");
        assert_eq!(RoomPhase::Polling.to_string(), "polling");
    }

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(RoomPhase::default(), RoomPhase::Idle);
        assert_eq!(RoomView::default().phase, RoomPhase::Idle);
    }

    #[test]
    fn zero_period_is_clamped() {
        assert_eq!(effective_period(Duration::ZERO), Duration::from_millis(1));
        assert_eq!(effective_period(Duration::from_secs(3)), Duration::from_secs(3));
    }
}
