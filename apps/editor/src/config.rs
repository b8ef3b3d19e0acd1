use std::time::Duration;

use anyhow::{Context, Result};

use crate::editor::EditorSettings;

/// Application configuration loaded from environment variables.
/// Without `DATABASE_URL` the service runs on the in-memory document store.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub autosave_debounce: Duration,
    pub preserve_derived_content: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            autosave_debounce: Duration::from_millis(
                std::env::var("AUTOSAVE_DEBOUNCE_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse::<u64>()
                    .context("AUTOSAVE_DEBOUNCE_MS must be a whole number of milliseconds")?,
            ),
            preserve_derived_content: std::env::var("PRESERVE_DERIVED_CONTENT")
                .unwrap_or_else(|_| "true".to_string())
                .parse::<bool>()
                .context("PRESERVE_DERIVED_CONTENT must be 'true' or 'false'")?,
        })
    }

    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            debounce: self.autosave_debounce,
            preserve_derived_content: self.preserve_derived_content,
        }
    }
}
