//! In-process document store. Used when no database is configured and by tests,
//! which can script failures and latency and inspect every save.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::document::{legacy, DocumentModel};
use crate::errors::PersistenceError;
use crate::persistence::{DocumentStore, SavePayload};

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<Uuid, DocumentModel>>,
    saves: Mutex<Vec<(Uuid, SavePayload)>>,
    failures: Mutex<VecDeque<PersistenceError>>,
    latency: Mutex<Duration>,
    load_latency: Mutex<Duration>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, doc: DocumentModel) {
        self.documents.lock().await.insert(doc.id, doc);
    }

    pub async fn get(&self, id: Uuid) -> Option<DocumentModel> {
        self.documents.lock().await.get(&id).cloned()
    }

    /// The next save fails with `err` instead of writing.
    pub async fn fail_next_save(&self, err: PersistenceError) {
        self.failures.lock().await.push_back(err);
    }

    /// Every save sleeps this long before completing.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    /// Every load sleeps this long before answering.
    pub async fn set_load_latency(&self, latency: Duration) {
        *self.load_latency.lock().await = latency;
    }

    pub async fn saves(&self) -> Vec<(Uuid, SavePayload)> {
        self.saves.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        self.saves.lock().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, id: Uuid) -> Result<DocumentModel, PersistenceError> {
        let latency = *self.load_latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.get(id).await.ok_or(PersistenceError::NotFound(id))
    }

    async fn save(&self, id: Uuid, payload: &SavePayload) -> Result<(), PersistenceError> {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.saves.lock().await.push((id, payload.clone()));
        if let Some(err) = self.failures.lock().await.pop_front() {
            return Err(err);
        }

        let mut documents = self.documents.lock().await;
        let existing = documents.get(&id).ok_or(PersistenceError::NotFound(id))?;
        let mut stored = DocumentModel::from_parts(
            id,
            existing.name.clone(),
            payload.general.clone(),
            payload.sections.clone(),
            Default::default(),
        );
        legacy::sync(&mut stored);
        documents.insert(id, stored);
        Ok(())
    }
}
