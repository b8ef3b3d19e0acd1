use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the number of open editing sessions.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "templar-editor",
        "open_sessions": state.sessions.len().await,
        "autosave_debounce_ms": state.config.autosave_debounce.as_millis() as u64,
    }))
}
