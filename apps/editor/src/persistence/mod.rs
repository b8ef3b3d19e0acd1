//! Persistence contract consumed by the editing core.
//!
//! `AppState` holds an `Arc<dyn DocumentStore>`: `PgDocumentStore` when a database
//! is configured, `MemoryDocumentStore` otherwise (and in tests).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{DocumentModel, GeneralData, Section};
use crate::errors::PersistenceError;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// What a save sends to the store. Sections travel in their current display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    pub general: GeneralData,
    pub sections: Vec<Section>,
    /// Ask the store to keep machine-generated content attached to reserved keys.
    pub preserve_derived_content: bool,
}

impl SavePayload {
    pub fn from_document(doc: &DocumentModel, preserve_derived_content: bool) -> Self {
        Self {
            general: doc.general().clone(),
            sections: doc.ordered_sections(),
            preserve_derived_content,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the document as persisted; legacy upgrade happens in the caller.
    async fn load(&self, id: Uuid) -> Result<DocumentModel, PersistenceError>;

    async fn save(&self, id: Uuid, payload: &SavePayload) -> Result<(), PersistenceError>;
}
