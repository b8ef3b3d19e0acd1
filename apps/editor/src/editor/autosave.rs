//! AutoSave Controller — dirty tracking, debouncing and single-flight saves.
//!
//! # State machine
//! ```text
//! Clean --mutation--> Dirty --deadline--> Saving --success, same digest--> Clean
//!                       ^                   |
//!                       +---failure---------+
//!                       +---success, content changed meanwhile---+
//! ```
//! `Saving -> Saving` never happens: `begin_save` refuses while a save is in flight.
//!
//! The controller is pure. It is fed `tokio::time::Instant` values by its caller and
//! never sleeps, spawns or performs I/O itself, which keeps every race testable.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::document::ContentDigest;
use crate::errors::{EditorError, PersistenceError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    Clean,
    Dirty,
    Saving,
}

/// Result of a save attempt or a save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Persisted and nothing changed meanwhile; the session is clean.
    Saved,
    /// Persisted, but newer edits arrived during the save; the session stays dirty.
    Superseded,
    /// A save was already in flight; the request rides on its completion.
    Coalesced,
    /// Nothing to persist.
    NothingToSave,
    /// The store rejected the write; the session stays dirty.
    Failed(PersistenceError),
    /// The session was closed while the save was in flight.
    Discarded,
}

/// Issued by `begin_save`; must be handed back to `finish_save`.
#[derive(Debug)]
pub struct SaveTicket {
    digest: ContentDigest,
}

impl SaveTicket {
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }
}

#[derive(Debug)]
pub struct AutoSaveController {
    state: SaveState,
    debounce: Duration,
    deadline: Option<Instant>,
    /// A manual save arrived while another save was in flight.
    manual_pending: bool,
    last_error: Option<PersistenceError>,
    saves_completed: u64,
}

impl AutoSaveController {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SaveState::Clean,
            debounce,
            deadline: None,
            manual_pending: false,
            last_error: None,
            saves_completed: 0,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state != SaveState::Clean
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_error(&self) -> Option<&PersistenceError> {
        self.last_error.as_ref()
    }

    pub fn saves_completed(&self) -> u64 {
        self.saves_completed
    }

    /// Any mutator call. Re-arms the debounce timer unless a save is in flight;
    /// completion of that save decides what happens next.
    pub fn record_mutation(&mut self, now: Instant) {
        match self.state {
            SaveState::Clean | SaveState::Dirty => {
                self.state = SaveState::Dirty;
                self.deadline = Some(now + self.debounce);
            }
            SaveState::Saving => {}
        }
    }

    /// True when the timer has fired, the session is dirty and nothing is in flight.
    pub fn is_due(&self, now: Instant) -> bool {
        self.state == SaveState::Dirty && self.deadline.is_some_and(|at| at <= now)
    }

    /// Moves to `Saving`, recording the digest of the content being written.
    pub fn begin_save(&mut self, digest: ContentDigest) -> Result<SaveTicket, EditorError> {
        match self.state {
            SaveState::Dirty => {
                self.state = SaveState::Saving;
                self.deadline = None;
                self.manual_pending = false;
                Ok(SaveTicket { digest })
            }
            SaveState::Saving => Err(EditorError::InvalidState(
                "a save is already in flight".to_string(),
            )),
            SaveState::Clean => Err(EditorError::InvalidState(
                "document has no unsaved changes".to_string(),
            )),
        }
    }

    /// Manual save request. Bypasses the debounce by pulling the deadline to `now`.
    pub fn request_manual(&mut self, now: Instant) -> Option<SaveOutcome> {
        match self.state {
            SaveState::Clean => Some(SaveOutcome::NothingToSave),
            SaveState::Dirty => {
                self.deadline = Some(now);
                None
            }
            SaveState::Saving => {
                self.manual_pending = true;
                Some(SaveOutcome::Coalesced)
            }
        }
    }

    /// Completes the in-flight save. `current` is the digest of the document now,
    /// which may differ from the ticket's if edits arrived during the save.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), PersistenceError>,
        current: &ContentDigest,
        now: Instant,
    ) -> SaveOutcome {
        let manual = std::mem::take(&mut self.manual_pending);
        match result {
            Ok(()) => {
                self.last_error = None;
                self.saves_completed += 1;
                if &ticket.digest == current {
                    self.state = SaveState::Clean;
                    self.deadline = None;
                    SaveOutcome::Saved
                } else {
                    self.state = SaveState::Dirty;
                    self.deadline = Some(if manual { now } else { now + self.debounce });
                    SaveOutcome::Superseded
                }
            }
            Err(err) => {
                self.state = SaveState::Dirty;
                self.deadline = err.is_retryable().then(|| now + self.debounce);
                self.last_error = Some(err.clone());
                SaveOutcome::Failed(err)
            }
        }
    }

    /// Only permitted while dirty with nothing in flight.
    pub fn revert(&mut self) -> Result<(), EditorError> {
        match self.state {
            SaveState::Dirty => {
                self.state = SaveState::Clean;
                self.deadline = None;
                self.last_error = None;
                Ok(())
            }
            SaveState::Clean => Err(EditorError::InvalidState(
                "nothing to revert".to_string(),
            )),
            SaveState::Saving => Err(EditorError::InvalidState(
                "cannot revert while a save is in flight".to_string(),
            )),
        }
    }

    pub fn cancel_timer(&mut self) {
        self.deadline = None;
    }
}

impl Default for AutoSaveController {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentModel;
    use uuid::Uuid;

    fn digest_of(content: &str) -> ContentDigest {
        let mut doc = DocumentModel::new(Uuid::nil(), "d");
        doc.add_section("summary", "Summary", content).unwrap();
        doc.digest()
    }

    #[test]
    fn test_mutation_marks_dirty_and_arms_timer() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        assert_eq!(c.state(), SaveState::Clean);
        c.record_mutation(now);
        assert_eq!(c.state(), SaveState::Dirty);
        assert_eq!(c.deadline(), Some(now + DEFAULT_DEBOUNCE));
        assert!(!c.is_due(now));
        assert!(c.is_due(now + DEFAULT_DEBOUNCE));
    }

    #[test]
    fn test_burst_rearms_timer() {
        let start = Instant::now();
        let mut c = AutoSaveController::default();
        for i in 0..10 {
            c.record_mutation(start + Duration::from_millis(100 * i));
        }
        let last = start + Duration::from_millis(900);
        assert_eq!(c.deadline(), Some(last + DEFAULT_DEBOUNCE));
        assert!(!c.is_due(start + DEFAULT_DEBOUNCE));
    }

    #[test]
    fn test_success_with_same_digest_is_clean() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let ticket = c.begin_save(digest_of("a")).unwrap();
        assert_eq!(c.state(), SaveState::Saving);
        let outcome = c.finish_save(ticket, Ok(()), &digest_of("a"), now);
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(c.state(), SaveState::Clean);
        assert_eq!(c.deadline(), None);
        assert_eq!(c.saves_completed(), 1);
    }

    #[test]
    fn test_stale_success_stays_dirty() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let ticket = c.begin_save(digest_of("D1")).unwrap();
        c.record_mutation(now);
        let outcome = c.finish_save(ticket, Ok(()), &digest_of("D2"), now);
        assert_eq!(outcome, SaveOutcome::Superseded);
        assert_eq!(c.state(), SaveState::Dirty);
        assert_eq!(c.deadline(), Some(now + DEFAULT_DEBOUNCE));
    }

    #[test]
    fn test_no_second_save_while_in_flight() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let _ticket = c.begin_save(digest_of("a")).unwrap();
        assert!(matches!(
            c.begin_save(digest_of("a")),
            Err(EditorError::InvalidState(_))
        ));
        assert!(!c.is_due(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_transport_failure_rearms_retry() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let ticket = c.begin_save(digest_of("a")).unwrap();
        let err = PersistenceError::Transport("timeout".into());
        let outcome = c.finish_save(ticket, Err(err.clone()), &digest_of("a"), now);
        assert_eq!(outcome, SaveOutcome::Failed(err.clone()));
        assert_eq!(c.state(), SaveState::Dirty);
        assert_eq!(c.last_error(), Some(&err));
        assert_eq!(c.deadline(), Some(now + DEFAULT_DEBOUNCE));
    }

    #[test]
    fn test_validation_failure_not_retried() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let ticket = c.begin_save(digest_of("a")).unwrap();
        c.finish_save(
            ticket,
            Err(PersistenceError::Validation("too long".into())),
            &digest_of("a"),
            now,
        );
        assert_eq!(c.state(), SaveState::Dirty);
        assert_eq!(c.deadline(), None);
    }

    #[test]
    fn test_manual_request_while_saving_is_coalesced() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        let ticket = c.begin_save(digest_of("a")).unwrap();
        assert_eq!(c.request_manual(now), Some(SaveOutcome::Coalesced));
        c.record_mutation(now);
        let later = now + Duration::from_millis(300);
        c.finish_save(ticket, Ok(()), &digest_of("b"), later);
        assert_eq!(c.deadline(), Some(later));
        assert!(c.is_due(later));
    }

    #[test]
    fn test_manual_request_bypasses_debounce() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        c.record_mutation(now);
        assert_eq!(c.request_manual(now), None);
        assert!(c.is_due(now));
    }

    #[test]
    fn test_manual_request_when_clean() {
        let mut c = AutoSaveController::default();
        assert_eq!(
            c.request_manual(Instant::now()),
            Some(SaveOutcome::NothingToSave)
        );
    }

    #[test]
    fn test_revert_rules() {
        let now = Instant::now();
        let mut c = AutoSaveController::default();
        assert!(c.revert().is_err());
        c.record_mutation(now);
        c.revert().unwrap();
        assert_eq!(c.state(), SaveState::Clean);
        assert_eq!(c.deadline(), None);

        c.record_mutation(now);
        let _ticket = c.begin_save(digest_of("a")).unwrap();
        assert!(c.revert().is_err());
    }
}
