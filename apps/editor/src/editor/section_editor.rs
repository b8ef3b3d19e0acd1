//! Section Editor — the consumer-facing handle over one editing session.
//!
//! Mutators are synchronous: they take the session lock, apply the change, mark the
//! session dirty and wake the autosave task. The lock is never held across the
//! persistence call, so a slow save does not block typing.
//!
//! # Autosave task
//! `spawn_autosave` starts one tokio task per session. It sleeps until the debounce
//! deadline (re-checking whenever a mutator wakes it), runs the due save, and exits
//! once the session is closed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{
    legacy, reorder, Direction, DocumentModel, GeneralField, Reorder, Section, SectionPatch,
};
use crate::editor::autosave::{AutoSaveController, SaveOutcome, DEFAULT_DEBOUNCE};
use crate::editor::session::{EditingSession, PendingSave, SaveStatus};
use crate::errors::EditorError;
use crate::persistence::{DocumentStore, SavePayload};

/// Knobs taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct EditorSettings {
    pub debounce: Duration,
    pub preserve_derived_content: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            preserve_derived_content: true,
        }
    }
}

#[derive(Clone)]
pub struct SectionEditor {
    document_id: Uuid,
    session: Arc<Mutex<EditingSession>>,
    store: Arc<dyn DocumentStore>,
    wake: Arc<Notify>,
    settings: EditorSettings,
}

// ────────────────────────────────────────────────────────────────────────────
// Opening
// ────────────────────────────────────────────────────────────────────────────

impl SectionEditor {
    /// Loads a document, upgrades a legacy-only schema, and opens a session on it.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        document_id: Uuid,
        settings: EditorSettings,
    ) -> Result<Self, EditorError> {
        let mut document = store.load(document_id).await?;
        let upgraded = legacy::upgrade_on_load(&mut document)?;
        info!(
            "Opened editing session for document {document_id} ({} sections)",
            document.len()
        );
        let editor = Self::with_document(store, document, settings);
        if upgraded {
            editor.lock().mark_upgraded(Instant::now());
        }
        Ok(editor)
    }

    /// Opens a session on a document already in hand.
    pub fn with_document(
        store: Arc<dyn DocumentStore>,
        document: DocumentModel,
        settings: EditorSettings,
    ) -> Self {
        let session = EditingSession::open(document, AutoSaveController::new(settings.debounce));
        Self {
            document_id: session.document().id,
            session: Arc::new(Mutex::new(session)),
            store,
            wake: Arc::new(Notify::new()),
            settings,
        }
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    fn lock(&self) -> MutexGuard<'_, EditingSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut DocumentModel) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        let out = self.lock().mutate(Instant::now(), f)?;
        self.wake.notify_one();
        Ok(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reads
// ────────────────────────────────────────────────────────────────────────────

impl SectionEditor {
    pub fn document(&self) -> DocumentModel {
        self.lock().document().clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.lock().status()
    }

    pub fn ordered_sections(&self) -> Vec<Section> {
        self.lock().document().ordered_sections()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section operations
// ────────────────────────────────────────────────────────────────────────────

impl SectionEditor {
    pub fn set_general_field(&self, field: GeneralField, value: String) -> Result<(), EditorError> {
        self.mutate(|doc| {
            doc.set_general_field(field, value);
            Ok(())
        })
    }

    pub fn upsert_section(&self, key: &str, patch: SectionPatch) -> Result<(), EditorError> {
        self.mutate(|doc| doc.upsert_section(key, patch))
    }

    /// User-initiated add; never overwrites an existing section.
    pub fn add_section(
        &self,
        key: &str,
        title: String,
        initial_content: String,
    ) -> Result<(), EditorError> {
        self.mutate(|doc| doc.add_section(key, title, initial_content))
    }

    /// Called by the rich-text widget's change callback on every edit.
    pub fn update_section_content(&self, key: &str, content: String) -> Result<(), EditorError> {
        self.mutate(|doc| doc.update_section_content(key, content))
    }

    pub fn rename_section(&self, key: &str, title: String) -> Result<(), EditorError> {
        self.mutate(|doc| doc.rename_section(key, title))
    }

    pub fn remove_section(&self, key: &str) -> Result<Section, EditorError> {
        self.mutate(|doc| doc.remove_section(key))
    }

    pub fn move_section(&self, key: &str, direction: Direction) -> Result<(), EditorError> {
        self.mutate(|doc| {
            let request = reorder::step(doc.sections(), key, direction)?;
            doc.apply_reorder(&request)
        })
    }

    /// Drag-completion: the full ordering as the UI sees it.
    pub fn set_full_order(&self, ordered_keys: Vec<String>) -> Result<(), EditorError> {
        self.mutate(|doc| doc.apply_reorder(&Reorder::Explicit(ordered_keys)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Saving, revert, close
// ────────────────────────────────────────────────────────────────────────────

impl SectionEditor {
    /// Saves now, bypassing the debounce. While another save is in flight the
    /// request is coalesced into that save's completion instead.
    pub async fn save_now(&self) -> Result<SaveOutcome, EditorError> {
        let pending = match self.lock().begin_manual_save(Instant::now()) {
            Ok(pending) => pending,
            Err(SaveOutcome::Discarded) => return Err(EditorError::SessionClosed),
            Err(outcome) => return Ok(outcome),
        };
        match self.run_save(pending).await {
            SaveOutcome::Failed(err) => Err(err.into()),
            outcome => Ok(outcome),
        }
    }

    /// Runs the debounced save if its deadline has passed.
    pub async fn flush_due(&self) -> Option<SaveOutcome> {
        let pending = self.lock().begin_due_save(Instant::now())?;
        Some(self.run_save(pending).await)
    }

    async fn run_save(&self, pending: PendingSave) -> SaveOutcome {
        let payload =
            SavePayload::from_document(&pending.document, self.settings.preserve_derived_content);
        let result = self.store.save(self.document_id, &payload).await;
        let outcome = self.lock().finish_save(pending, result, Instant::now());
        // Re-armed deadlines (stale success, retry, coalesced manual save) need the task.
        self.wake.notify_one();
        outcome
    }

    pub fn revert(&self) -> Result<(), EditorError> {
        self.lock().revert(Instant::now())?;
        self.wake.notify_one();
        Ok(())
    }

    pub fn close(&self) {
        self.lock().close();
        self.wake.notify_one();
        info!("Closed editing session for document {}", self.document_id);
    }

    pub fn spawn_autosave(&self) -> JoinHandle<()> {
        let editor = self.clone();
        tokio::spawn(async move { editor.autosave_loop().await })
    }

    async fn autosave_loop(self) {
        loop {
            let deadline = {
                let session = self.lock();
                if session.is_closed() {
                    break;
                }
                session.next_deadline()
            };

            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {
                            self.flush_due().await;
                        }
                        _ = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
        debug!("Autosave task for document {} stopped", self.document_id);
    }
}
