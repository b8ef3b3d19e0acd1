//! Axum route handlers for the Editor API.
//!
//! Every handler resolves the open session for the path's document id and calls one
//! `SectionEditor` operation. Responses carry the document in display order plus the
//! save indicator, so the client always renders what the core holds.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{
    Direction, DocumentModel, GeneralData, GeneralField, LegacyFields, Section, SectionPatch,
};
use crate::editor::autosave::SaveOutcome;
use crate::editor::section_editor::SectionEditor;
use crate::editor::session::SaveStatus;
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GeneralFieldRequest {
    pub field: GeneralField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSectionRequest {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub ordered_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: Uuid,
    pub name: String,
    pub general: GeneralData,
    /// Display order.
    pub sections: Vec<Section>,
    pub legacy: LegacyFields,
}

impl From<&DocumentModel> for DocumentView {
    fn from(doc: &DocumentModel) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            general: doc.general().clone(),
            sections: doc.ordered_sections(),
            legacy: doc.legacy().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditorResponse {
    pub document: DocumentView,
    pub status: SaveStatus,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub outcome: SaveOutcome,
    pub status: SaveStatus,
}

fn respond(editor: &SectionEditor) -> Json<EditorResponse> {
    Json(EditorResponse {
        document: DocumentView::from(&editor.document()),
        status: editor.status(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/documents/:id/editor
pub async fn handle_open(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.open(id).await?;
    Ok(respond(&editor))
}

/// GET /api/v1/documents/:id/editor
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    Ok(respond(&editor))
}

/// DELETE /api/v1/documents/:id/editor
pub async fn handle_close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/documents/:id/editor/general
pub async fn handle_set_general(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<GeneralFieldRequest>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.set_general_field(req.field, req.value)?;
    Ok(respond(&editor))
}

/// POST /api/v1/documents/:id/editor/sections
pub async fn handle_add_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddSectionRequest>,
) -> Result<(StatusCode, Json<EditorResponse>), AppError> {
    let editor = state.sessions.get(id).await?;
    editor.add_section(&req.key, req.title, req.content)?;
    Ok((StatusCode::CREATED, respond(&editor)))
}

/// PUT /api/v1/documents/:id/editor/sections/:key
pub async fn handle_upsert_section(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(patch): Json<SectionPatch>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.upsert_section(&key, patch)?;
    Ok(respond(&editor))
}

/// DELETE /api/v1/documents/:id/editor/sections/:key
///
/// Confirmation happens in the client before this is called.
pub async fn handle_remove_section(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.remove_section(&key)?;
    Ok(respond(&editor))
}

/// PUT /api/v1/documents/:id/editor/sections/:key/content
///
/// Driven by the rich-text widget's change callback; returns only the save status
/// to keep the hot path small.
pub async fn handle_update_content(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<SaveStatus>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.update_section_content(&key, req.content)?;
    Ok(Json(editor.status()))
}

/// PUT /api/v1/documents/:id/editor/sections/:key/title
pub async fn handle_rename_section(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<TitleRequest>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.rename_section(&key, req.title)?;
    Ok(respond(&editor))
}

/// POST /api/v1/documents/:id/editor/sections/:key/move
pub async fn handle_move_section(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.move_section(&key, req.direction)?;
    Ok(respond(&editor))
}

/// PUT /api/v1/documents/:id/editor/order
pub async fn handle_set_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.set_full_order(req.ordered_keys)?;
    Ok(respond(&editor))
}

/// POST /api/v1/documents/:id/editor/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    let outcome = editor.save_now().await?;
    Ok(Json(SaveResponse {
        outcome,
        status: editor.status(),
    }))
}

/// POST /api/v1/documents/:id/editor/revert
pub async fn handle_revert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EditorResponse>, AppError> {
    let editor = state.sessions.get(id).await?;
    editor.revert()?;
    Ok(respond(&editor))
}
