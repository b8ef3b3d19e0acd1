use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::editor::section_editor::{EditorSettings, SectionEditor};
use crate::errors::EditorError;
use crate::persistence::DocumentStore;

/// One live `SectionEditor` per open document id.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn DocumentStore>,
    settings: EditorSettings,
    editors: Arc<RwLock<HashMap<Uuid, SectionEditor>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, settings: EditorSettings) -> Self {
        Self {
            store,
            settings,
            editors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the open session for `id`, opening one (and its autosave task) if needed.
    pub async fn open(&self, id: Uuid) -> Result<SectionEditor, EditorError> {
        if let Some(editor) = self.editors.read().await.get(&id) {
            return Ok(editor.clone());
        }

        // Load without the lock; a concurrent open of the same id may win the insert.
        let loaded = SectionEditor::open(self.store.clone(), id, self.settings).await?;
        let mut editors = self.editors.write().await;
        if let Some(editor) = editors.get(&id) {
            return Ok(editor.clone());
        }
        loaded.spawn_autosave();
        editors.insert(id, loaded.clone());
        Ok(loaded)
    }

    pub async fn get(&self, id: Uuid) -> Result<SectionEditor, EditorError> {
        self.editors
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| EditorError::NotFound(format!("no open editing session for {id}")))
    }

    /// Ends the session for `id`. Unsaved edits stay unsaved; callers save first.
    pub async fn close(&self, id: Uuid) -> Result<(), EditorError> {
        let editor = self
            .editors
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| EditorError::NotFound(format!("no open editing session for {id}")))?;
        editor.close();
        info!(
            "Session for document {} closed; {} still open",
            editor.document_id(),
            self.len().await
        );
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.editors.read().await.len()
    }
}
