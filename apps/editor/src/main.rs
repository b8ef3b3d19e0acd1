mod config;
mod db;
mod document;
mod editor;
mod errors;
mod models;
mod persistence;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::persistence::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Templar editor v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let store = PgDocumentStore::new(create_pool(url).await?);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; documents live in memory and are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    info!(
        "Autosave debounce {}ms, preserve_derived_content={}",
        config.autosave_debounce.as_millis(),
        config.preserve_derived_content
    );

    let app = build_router(AppState::new(store, config.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client's host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
