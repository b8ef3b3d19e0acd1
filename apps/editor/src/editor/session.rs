//! Editing Session — the live document, its last-saved baseline and the autosave state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::document::DocumentModel;
use crate::editor::autosave::{AutoSaveController, SaveOutcome, SaveState, SaveTicket};
use crate::errors::{EditorError, PersistenceError};

/// User-facing save indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveStatus {
    pub state: SaveState,
    pub dirty: bool,
    pub last_error: Option<PersistenceError>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub saves_completed: u64,
}

/// A save that has left the session: the exact content being written plus the
/// ticket needed to complete it.
#[derive(Debug)]
pub struct PendingSave {
    pub ticket: SaveTicket,
    pub document: DocumentModel,
}

#[derive(Debug)]
pub struct EditingSession {
    document: DocumentModel,
    last_saved: DocumentModel,
    autosave: AutoSaveController,
    last_saved_at: Option<DateTime<Utc>>,
    /// False while `last_saved` holds a load-time upgrade the store has not seen.
    baseline_persisted: bool,
    closed: bool,
}

impl EditingSession {
    /// Opens a session on a document that has already been through the legacy upgrade.
    pub fn open(document: DocumentModel, autosave: AutoSaveController) -> Self {
        Self {
            last_saved: document.clone(),
            document,
            autosave,
            last_saved_at: None,
            baseline_persisted: true,
            closed: false,
        }
    }

    /// The document was rewritten on load, so the store still holds the old shape.
    /// The session starts dirty and stays so until a save lands.
    pub fn mark_upgraded(&mut self, now: Instant) {
        self.baseline_persisted = false;
        self.autosave.record_mutation(now);
    }

    pub fn document(&self) -> &DocumentModel {
        &self.document
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    pub fn status(&self) -> SaveStatus {
        SaveStatus {
            state: self.autosave.state(),
            dirty: self.autosave.is_dirty(),
            last_error: self.autosave.last_error().cloned(),
            last_saved_at: self.last_saved_at,
            saves_completed: self.autosave.saves_completed(),
        }
    }

    /// Runs one mutator. Only a successful mutation marks the session dirty;
    /// the last-saved baseline is never touched here.
    pub fn mutate<T>(
        &mut self,
        now: Instant,
        f: impl FnOnce(&mut DocumentModel) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        if self.closed {
            return Err(EditorError::SessionClosed);
        }
        let out = f(&mut self.document)?;
        self.autosave.record_mutation(now);
        Ok(out)
    }

    /// Starts the debounced save if its timer has fired.
    pub fn begin_due_save(&mut self, now: Instant) -> Option<PendingSave> {
        if self.closed || !self.autosave.is_due(now) {
            return None;
        }
        self.begin_save().ok()
    }

    /// Starts a save immediately, or reports why none was started.
    pub fn begin_manual_save(&mut self, now: Instant) -> Result<PendingSave, SaveOutcome> {
        if self.closed {
            return Err(SaveOutcome::Discarded);
        }
        if let Some(outcome) = self.autosave.request_manual(now) {
            return Err(outcome);
        }
        self.begin_save().map_err(|_| SaveOutcome::Coalesced)
    }

    fn begin_save(&mut self) -> Result<PendingSave, EditorError> {
        let ticket = self.autosave.begin_save(self.document.digest())?;
        debug!(
            "Save started for document {} (digest {})",
            self.document.id,
            ticket.digest().as_str()
        );
        Ok(PendingSave {
            ticket,
            document: self.document.clone(),
        })
    }

    /// Applies the store's answer. A successful write always becomes the new
    /// baseline, even when newer edits keep the session dirty.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        result: Result<(), PersistenceError>,
        now: Instant,
    ) -> SaveOutcome {
        if self.closed {
            debug!(
                "Discarding save result for closed session {}",
                self.document.id
            );
            return SaveOutcome::Discarded;
        }

        let succeeded = result.is_ok();
        let current = self.document.digest();
        let outcome = self.autosave.finish_save(pending.ticket, result, &current, now);
        if succeeded {
            self.baseline_persisted = true;
            self.last_saved = pending.document;
            self.last_saved_at = Some(Utc::now());
        }

        match &outcome {
            SaveOutcome::Saved => info!("Document {} saved", self.document.id),
            SaveOutcome::Superseded => info!(
                "Document {} saved, newer edits pending",
                self.document.id
            ),
            SaveOutcome::Failed(err) => warn!(
                "Save failed for document {}: {err} (retry scheduled: {})",
                self.document.id,
                self.autosave.deadline().is_some()
            ),
            _ => {}
        }
        outcome
    }

    /// Restores the last-saved baseline. Rejected unless the session is dirty.
    /// An unpersisted upgrade survives the revert and stays due for saving.
    pub fn revert(&mut self, now: Instant) -> Result<(), EditorError> {
        if self.closed {
            return Err(EditorError::SessionClosed);
        }
        self.autosave.revert()?;
        self.document = self.last_saved.clone();
        if !self.baseline_persisted {
            self.autosave.record_mutation(now);
        }
        info!("Document {} reverted to last save", self.document.id);
        Ok(())
    }

    /// Cancels the pending timer. An in-flight save may still finish but is discarded.
    pub fn close(&mut self) {
        self.autosave.cancel_timer();
        self.closed = true;
        if self.autosave.is_dirty() {
            warn!(
                "Closing session for document {} with unsaved changes",
                self.document.id
            );
        }
    }
}
