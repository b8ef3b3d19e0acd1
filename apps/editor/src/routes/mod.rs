pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::editor::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Editing session lifecycle
        .route(
            "/api/v1/documents/:id/editor",
            post(handlers::handle_open)
                .get(handlers::handle_get)
                .delete(handlers::handle_close),
        )
        .route(
            "/api/v1/documents/:id/editor/general",
            put(handlers::handle_set_general),
        )
        // Sections
        .route(
            "/api/v1/documents/:id/editor/sections",
            post(handlers::handle_add_section),
        )
        .route(
            "/api/v1/documents/:id/editor/sections/:key",
            put(handlers::handle_upsert_section).delete(handlers::handle_remove_section),
        )
        .route(
            "/api/v1/documents/:id/editor/sections/:key/content",
            put(handlers::handle_update_content),
        )
        .route(
            "/api/v1/documents/:id/editor/sections/:key/title",
            put(handlers::handle_rename_section),
        )
        .route(
            "/api/v1/documents/:id/editor/sections/:key/move",
            post(handlers::handle_move_section),
        )
        .route(
            "/api/v1/documents/:id/editor/order",
            put(handlers::handle_set_order),
        )
        // Persistence
        .route(
            "/api/v1/documents/:id/editor/save",
            post(handlers::handle_save),
        )
        .route(
            "/api/v1/documents/:id/editor/revert",
            post(handlers::handle_revert),
        )
        .with_state(state)
}
