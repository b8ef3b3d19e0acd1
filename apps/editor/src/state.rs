use std::sync::Arc;

use crate::config::Config;
use crate::editor::SessionRegistry;
use crate::persistence::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Open editing sessions, all backed by the same document store.
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            sessions: SessionRegistry::new(store, config.editor_settings()),
            config,
        }
    }
}
