//! Playback controller state machine
//!
//! Pure decision logic. Inputs are queue snapshots, player events, viewer
//! actions and clock readings; outputs are `Action`s that the runtime carries
//! out in order. Nothing here performs I/O, so every transition can be driven
//! directly from tests with a synthetic clock.

use kq_common::api::QueueSnapshot;
use kq_common::QueueEntry;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Display state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No snapshot received yet
    Loading,
    /// Queue is empty, nothing loaded
    IdleEmpty,
    /// Current entry loaded in the player
    Playing,
    /// Player reported a failure for the current entry
    ErrorFallback,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Loading => write!(f, "loading"),
            ControllerState::IdleEmpty => write!(f, "idle"),
            ControllerState::Playing => write!(f, "playing"),
            ControllerState::ErrorFallback => write!(f, "error-fallback"),
        }
    }
}

/// Player failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    /// Owner disabled embedding; the link still plays externally
    EmbeddingDisabled,
    /// Invalid id, decode failure, removed video, or an unknown code
    OtherPlaybackError,
}

impl PlaybackErrorKind {
    /// Classify a player error code
    pub fn classify(code: i32) -> Self {
        match code {
            101 | 150 => PlaybackErrorKind::EmbeddingDisabled,
            _ => PlaybackErrorKind::OtherPlaybackError,
        }
    }

    /// Headline shown on the fallback screen
    pub fn headline(&self) -> &'static str {
        match self {
            PlaybackErrorKind::EmbeddingDisabled => "Video Cannot Be Embedded",
            PlaybackErrorKind::OtherPlaybackError => "Video Error",
        }
    }
}

/// Events from the player widget or the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Player finished the current video
    Ended,
    /// Player failed with an error code
    Error(i32),
    /// Viewer skipped to the next song
    Next,
    /// Viewer asked to open the current link outside the player
    OpenExternal,
    /// First step of a delete: arm it for an entry id
    RequestDelete(String),
    /// Second step of a delete: must name the armed id
    ConfirmDelete(String),
    /// Disarm a pending delete
    CancelDelete,
}

/// Work for the runtime, performed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Load(QueueEntry),
    Stop,
    ShowFallback {
        entry: QueueEntry,
        kind: PlaybackErrorKind,
    },
    OpenExternal(String),
    /// Pop the head of the queue
    Advance,
    /// Ask the store for a random catalog entry
    AutoFill,
    /// Remove an entry by id
    Delete(String),
}

impl Action {
    /// True for actions that change the queue and need a re-poll afterwards
    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Advance | Action::AutoFill | Action::Delete(_))
    }
}

/// Playback controller for one display
#[derive(Debug)]
pub struct Controller {
    state: ControllerState,
    /// Entry currently in the player
    loaded: Option<QueueEntry>,
    /// Set once the store confirms the loaded entry was removed, so the next
    /// head loads even if it repeats the media id
    force_reload: bool,
    fallback: Option<PlaybackErrorKind>,
    pending_delete: Option<String>,
    /// Ids behind the head in the last snapshot
    waiting_ids: Vec<String>,
    /// `None` until the first successful snapshot
    last_queue_length: Option<usize>,
    last_activity: Instant,
    idle_timeout: Duration,
}

impl Controller {
    pub fn new(idle_timeout: Duration, now: Instant) -> Self {
        Self {
            state: ControllerState::Loading,
            loaded: None,
            force_reload: false,
            fallback: None,
            pending_delete: None,
            waiting_ids: Vec::new(),
            last_queue_length: None,
            last_activity: now,
            idle_timeout,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn loaded(&self) -> Option<&QueueEntry> {
        self.loaded.as_ref()
    }

    pub fn fallback(&self) -> Option<PlaybackErrorKind> {
        self.fallback
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Reconcile with a freshly fetched snapshot
    ///
    /// Only ever returns player actions. Applying the same snapshot twice
    /// returns nothing the second time.
    pub fn apply_snapshot(&mut self, snapshot: &QueueSnapshot, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();

        let loaded_media = self.loaded.as_ref().map(|e| e.media_id.clone());

        match &snapshot.current {
            Some(current)
                if self.force_reload
                    || loaded_media.as_deref() != Some(current.media_id.as_str()) =>
            {
                if loaded_media.is_none() {
                    self.touch(now, "slot filled");
                }
                info!(
                    "Now playing {} ({}) for {}",
                    current.media_id, current.title, current.submitter_name
                );
                self.loaded = Some(current.clone());
                self.fallback = None;
                self.state = ControllerState::Playing;
                actions.push(Action::Load(current.clone()));
            }
            Some(_) => {
                // Same video still at the head; keep Playing or ErrorFallback
            }
            None if loaded_media.is_some() => {
                info!("Queue is empty, stopping player");
                self.loaded = None;
                self.fallback = None;
                self.state = ControllerState::IdleEmpty;
                actions.push(Action::Stop);
            }
            None => {
                self.state = ControllerState::IdleEmpty;
            }
        }
        self.force_reload = false;

        if let Some(previous) = self.last_queue_length {
            if snapshot.queue_length > previous {
                self.touch(now, "queue grew");
            }
        }
        self.last_queue_length = Some(snapshot.queue_length);
        self.waiting_ids = snapshot.queue.iter().map(|e| e.id.clone()).collect();

        if let Some(armed) = &self.pending_delete {
            if !self.waiting_ids.contains(armed) {
                debug!("Armed delete {} no longer waiting, disarming", armed);
                self.pending_delete = None;
            }
        }

        actions
    }

    /// Idle timer tick
    ///
    /// Requests one auto-fill once the last observed queue has been empty with
    /// no activity for the idle threshold, then restarts the idle clock.
    pub fn check_idle(&mut self, now: Instant) -> Option<Action> {
        let length = self.last_queue_length?;
        if length != 0 {
            return None;
        }

        let idle_for = now.saturating_duration_since(self.last_activity);
        if idle_for < self.idle_timeout {
            return None;
        }

        info!("Queue idle for {:?}, requesting auto-fill", idle_for);
        self.last_activity = now;
        Some(Action::AutoFill)
    }

    /// Handle a player event or viewer action
    pub fn handle_input(&mut self, input: Input) -> Vec<Action> {
        match input {
            Input::Ended | Input::Next => {
                if self.loaded.is_none() {
                    debug!("{:?} with nothing loaded, ignoring", input);
                    return Vec::new();
                }
                info!("Advancing past current entry ({:?})", input);
                vec![Action::Advance]
            }

            Input::Error(code) => {
                let Some(entry) = self.loaded.clone() else {
                    debug!("Player error {} with nothing loaded, ignoring", code);
                    return Vec::new();
                };
                let kind = PlaybackErrorKind::classify(code);
                warn!("Player error {} on {}: {:?}", code, entry.media_id, kind);
                self.fallback = Some(kind);
                self.state = ControllerState::ErrorFallback;
                vec![Action::ShowFallback { entry, kind }]
            }

            Input::OpenExternal => match (&self.state, &self.loaded) {
                (ControllerState::ErrorFallback, Some(entry)) => {
                    vec![Action::OpenExternal(entry.source_url.clone())]
                }
                _ => {
                    debug!("Open external outside fallback, ignoring");
                    Vec::new()
                }
            },

            Input::RequestDelete(id) => {
                if self.loaded.as_ref().is_some_and(|e| e.id == id) {
                    warn!("Entry {} is playing; advance instead of deleting", id);
                } else if !self.waiting_ids.contains(&id) {
                    warn!("Entry {} is not waiting in the queue", id);
                } else {
                    debug!("Delete armed for {}", id);
                    self.pending_delete = Some(id);
                }
                Vec::new()
            }

            Input::ConfirmDelete(id) => {
                if self.pending_delete.as_deref() == Some(id.as_str()) {
                    self.pending_delete = None;
                    info!("Deleting entry {}", id);
                    vec![Action::Delete(id)]
                } else {
                    warn!("Delete confirmation for {} does not match the armed entry", id);
                    Vec::new()
                }
            }

            Input::CancelDelete => {
                if let Some(id) = self.pending_delete.take() {
                    debug!("Delete of {} cancelled", id);
                }
                Vec::new()
            }
        }
    }

    /// The store confirmed an advance removed `removed`
    ///
    /// Only a removal of the loaded entry arms a reload. A failed advance never
    /// reaches here, so the head it left in place is not restarted.
    pub fn advance_completed(&mut self, removed: &QueueEntry) {
        if self.loaded.as_ref().is_some_and(|e| e.id == removed.id) {
            self.force_reload = true;
        }
    }

    fn touch(&mut self, now: Instant, reason: &str) {
        debug!("Idle clock reset: {}", reason);
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(180);

    fn entry(media_id: &str) -> QueueEntry {
        QueueEntry::new(
            format!("https://youtu.be/{}", media_id),
            media_id,
            None,
            "Tester",
        )
    }

    fn snapshot(entries: &[QueueEntry]) -> QueueSnapshot {
        QueueSnapshot::from_entries(entries.to_vec())
    }

    fn loads(actions: &[Action]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Load(e) => Some(e.media_id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_starts_loading() {
        let controller = Controller::new(IDLE, Instant::now());
        assert_eq!(controller.state(), ControllerState::Loading);
        assert!(controller.loaded().is_none());
    }

    #[test]
    fn test_first_snapshot_loads_head() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");

        let actions = controller.apply_snapshot(&snapshot(&[x.clone()]), now);

        assert_eq!(actions, vec![Action::Load(x)]);
        assert_eq!(controller.state(), ControllerState::Playing);
    }

    #[test]
    fn test_empty_first_snapshot_is_idle_without_actions() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);

        let actions = controller.apply_snapshot(&QueueSnapshot::default(), now);

        assert!(actions.is_empty());
        assert_eq!(controller.state(), ControllerState::IdleEmpty);
    }

    #[test]
    fn test_polling_without_change_is_idempotent() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let snap = snapshot(&[entry("x"), entry("y")]);

        controller.apply_snapshot(&snap, now);
        for _ in 0..5 {
            assert!(controller.apply_snapshot(&snap, now).is_empty());
            assert_eq!(controller.state(), ControllerState::Playing);
        }
    }

    #[test]
    fn test_head_change_loads_new_entry_once() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        let y = entry("y");

        let mut all = controller.apply_snapshot(&snapshot(&[x.clone(), y.clone()]), now);
        all.extend(controller.apply_snapshot(&snapshot(&[y.clone()]), now));
        all.extend(controller.apply_snapshot(&snapshot(&[y.clone()]), now));

        assert_eq!(loads(&all), vec!["x", "y"]);
    }

    #[test]
    fn test_empty_after_playing_stops() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        controller.apply_snapshot(&snapshot(&[entry("x")]), now);

        let actions = controller.apply_snapshot(&QueueSnapshot::default(), now);

        assert_eq!(actions, vec![Action::Stop]);
        assert_eq!(controller.state(), ControllerState::IdleEmpty);
        assert!(controller.loaded().is_none());

        assert!(controller.apply_snapshot(&QueueSnapshot::default(), now).is_empty());
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(PlaybackErrorKind::classify(101), PlaybackErrorKind::EmbeddingDisabled);
        assert_eq!(PlaybackErrorKind::classify(150), PlaybackErrorKind::EmbeddingDisabled);
        for code in [2, 5, 100, 0, -1, 999] {
            assert_eq!(
                PlaybackErrorKind::classify(code),
                PlaybackErrorKind::OtherPlaybackError
            );
        }
    }

    #[test]
    fn test_error_enters_fallback_and_open_external() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        controller.apply_snapshot(&snapshot(&[x.clone()]), now);

        assert!(controller.handle_input(Input::OpenExternal).is_empty());

        let actions = controller.handle_input(Input::Error(150));
        assert_eq!(
            actions,
            vec![Action::ShowFallback {
                entry: x.clone(),
                kind: PlaybackErrorKind::EmbeddingDisabled
            }]
        );
        assert_eq!(controller.state(), ControllerState::ErrorFallback);

        // Re-polling the same head keeps the fallback up
        assert!(controller.apply_snapshot(&snapshot(&[x.clone()]), now).is_empty());
        assert_eq!(controller.state(), ControllerState::ErrorFallback);

        let actions = controller.handle_input(Input::OpenExternal);
        assert_eq!(actions, vec![Action::OpenExternal(x.source_url.clone())]);
        assert_eq!(controller.state(), ControllerState::ErrorFallback);
    }

    #[test]
    fn test_next_from_fallback_advances_and_loads_next() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        let y = entry("y");
        controller.apply_snapshot(&snapshot(&[x.clone(), y.clone()]), now);
        controller.handle_input(Input::Error(5));

        assert_eq!(controller.handle_input(Input::Next), vec![Action::Advance]);
        controller.advance_completed(&x);

        let actions = controller.apply_snapshot(&snapshot(&[y.clone()]), now);
        assert_eq!(actions, vec![Action::Load(y)]);
        assert_eq!(controller.state(), ControllerState::Playing);
        assert!(controller.fallback().is_none());
    }

    #[test]
    fn test_ended_reloads_repeated_media_id() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let first = entry("same");
        let second = entry("same");
        controller.apply_snapshot(&snapshot(&[first.clone(), second.clone()]), now);

        assert_eq!(controller.handle_input(Input::Ended), vec![Action::Advance]);
        controller.advance_completed(&first);
        let actions = controller.apply_snapshot(&snapshot(&[second.clone()]), now);

        assert_eq!(actions, vec![Action::Load(second)]);
    }

    #[test]
    fn test_failed_advance_does_not_reload_head() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        let y = entry("y");
        controller.apply_snapshot(&snapshot(&[x.clone(), y.clone()]), now);

        assert_eq!(controller.handle_input(Input::Next), vec![Action::Advance]);

        // Store rejected the pop; re-poll sees the same head
        assert!(controller.apply_snapshot(&snapshot(&[x.clone(), y]), now).is_empty());
        assert_eq!(controller.state(), ControllerState::Playing);
        assert_eq!(controller.loaded(), Some(&x));
    }

    #[test]
    fn test_failed_advance_keeps_fallback() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        controller.apply_snapshot(&snapshot(&[x.clone()]), now);
        controller.handle_input(Input::Error(101));

        controller.handle_input(Input::Next);
        assert!(controller.apply_snapshot(&snapshot(&[x.clone()]), now).is_empty());

        assert_eq!(controller.state(), ControllerState::ErrorFallback);
        assert_eq!(controller.fallback(), Some(PlaybackErrorKind::EmbeddingDisabled));
        assert_eq!(
            controller.handle_input(Input::OpenExternal),
            vec![Action::OpenExternal(x.source_url)]
        );
    }

    #[test]
    fn test_removal_of_other_entry_does_not_arm_reload() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        controller.apply_snapshot(&snapshot(&[x.clone()]), now);

        controller.advance_completed(&entry("x"));

        assert!(controller.apply_snapshot(&snapshot(&[x]), now).is_empty());
    }

    #[test]
    fn test_advance_with_nothing_loaded_is_ignored() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        controller.apply_snapshot(&QueueSnapshot::default(), now);

        assert!(controller.handle_input(Input::Ended).is_empty());
        assert!(controller.handle_input(Input::Next).is_empty());
        assert!(controller.handle_input(Input::Error(100)).is_empty());
    }

    #[test]
    fn test_no_auto_fill_before_first_snapshot() {
        let start = Instant::now();
        let mut controller = Controller::new(IDLE, start);

        assert!(controller.check_idle(start + IDLE * 10).is_none());
    }

    #[test]
    fn test_idle_threshold_triggers_exactly_one_auto_fill() {
        let start = Instant::now();
        let mut controller = Controller::new(IDLE, start);
        controller.apply_snapshot(&QueueSnapshot::default(), start);

        assert!(controller.check_idle(start + IDLE - Duration::from_secs(1)).is_none());

        let fired_at = start + IDLE;
        assert_eq!(controller.check_idle(fired_at), Some(Action::AutoFill));

        // Still empty right after; clock was reset
        controller.apply_snapshot(&QueueSnapshot::default(), fired_at);
        assert!(controller.check_idle(fired_at + Duration::from_secs(10)).is_none());
        assert!(controller.check_idle(fired_at + Duration::from_secs(20)).is_none());

        assert_eq!(controller.check_idle(fired_at + IDLE), Some(Action::AutoFill));
    }

    #[test]
    fn test_no_auto_fill_while_queue_has_entries() {
        let start = Instant::now();
        let mut controller = Controller::new(IDLE, start);
        controller.apply_snapshot(&snapshot(&[entry("x")]), start);

        assert!(controller.check_idle(start + IDLE * 3).is_none());
    }

    #[test]
    fn test_queue_growth_resets_idle_clock() {
        let start = Instant::now();
        let mut controller = Controller::new(IDLE, start);
        controller.apply_snapshot(&QueueSnapshot::default(), start);

        // Someone submits and the song finishes before the threshold
        let filled = start + Duration::from_secs(170);
        controller.apply_snapshot(&snapshot(&[entry("x")]), filled);
        let emptied = start + Duration::from_secs(175);
        controller.apply_snapshot(&QueueSnapshot::default(), emptied);

        assert!(controller.check_idle(start + IDLE).is_none());
        assert_eq!(controller.check_idle(filled + IDLE), Some(Action::AutoFill));
    }

    #[test]
    fn test_two_step_delete() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        let y = entry("y");
        controller.apply_snapshot(&snapshot(&[x, y.clone()]), now);

        assert!(controller.handle_input(Input::RequestDelete(y.id.clone())).is_empty());
        assert_eq!(controller.pending_delete(), Some(y.id.as_str()));

        // Wrong id does nothing and keeps the arm
        assert!(controller.handle_input(Input::ConfirmDelete("other".into())).is_empty());
        assert_eq!(controller.pending_delete(), Some(y.id.as_str()));

        let actions = controller.handle_input(Input::ConfirmDelete(y.id.clone()));
        assert_eq!(actions, vec![Action::Delete(y.id.clone())]);
        assert!(controller.pending_delete().is_none());
    }

    #[test]
    fn test_cancel_disarms_delete() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let y = entry("y");
        controller.apply_snapshot(&snapshot(&[entry("x"), y.clone()]), now);

        controller.handle_input(Input::RequestDelete(y.id.clone()));
        controller.handle_input(Input::CancelDelete);

        assert!(controller.pending_delete().is_none());
        assert!(controller.handle_input(Input::ConfirmDelete(y.id)).is_empty());
    }

    #[test]
    fn test_current_entry_cannot_be_deleted() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        controller.apply_snapshot(&snapshot(&[x.clone(), entry("y")]), now);

        controller.handle_input(Input::RequestDelete(x.id.clone()));

        assert!(controller.pending_delete().is_none());
        assert!(controller.handle_input(Input::ConfirmDelete(x.id)).is_empty());
    }

    #[test]
    fn test_armed_delete_drops_when_entry_leaves_queue() {
        let now = Instant::now();
        let mut controller = Controller::new(IDLE, now);
        let x = entry("x");
        let y = entry("y");
        controller.apply_snapshot(&snapshot(&[x.clone(), y.clone()]), now);
        controller.handle_input(Input::RequestDelete(y.id.clone()));

        // Another display removed it
        controller.apply_snapshot(&snapshot(&[x]), now);

        assert!(controller.pending_delete().is_none());
    }

    #[test]
    fn test_mutation_flags() {
        assert!(Action::Advance.is_mutation());
        assert!(Action::AutoFill.is_mutation());
        assert!(Action::Delete("a".into()).is_mutation());
        assert!(!Action::Stop.is_mutation());
        assert!(!Action::OpenExternal("u".into()).is_mutation());
    }
}
