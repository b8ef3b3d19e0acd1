//! Postgres-backed document store.
//!
//! Sections are stored as JSONB. The four legacy columns are rewritten from the
//! derived view on every save so readers of the old schema keep working.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{legacy, DocumentModel};
use crate::errors::PersistenceError;
use crate::models::document::ResumeDocumentRow;
use crate::persistence::{DocumentStore, SavePayload};

/// Postgres SQLSTATE codes treated as write conflicts.
const SERIALIZATION_FAILURE: &str = "40001";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates `resume_documents` if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resume_documents (
                id              UUID PRIMARY KEY,
                name            TEXT NOT NULL,
                title           TEXT NOT NULL DEFAULT '',
                full_name       TEXT NOT NULL DEFAULT '',
                email           TEXT NOT NULL DEFAULT '',
                phone           TEXT NOT NULL DEFAULT '',
                sections        JSONB NOT NULL DEFAULT '[]'::jsonb,
                experience      TEXT,
                education       TEXT,
                skills          TEXT,
                projects        TEXT,
                derived_content JSONB,
                updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("resume_documents schema ready");
        Ok(())
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if matches!(
                    db.code().as_deref(),
                    Some(SERIALIZATION_FAILURE) | Some(UNIQUE_VIOLATION)
                ) =>
            {
                PersistenceError::Conflict(db.message().to_string())
            }
            _ => PersistenceError::Transport(err.to_string()),
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn load(&self, id: Uuid) -> Result<DocumentModel, PersistenceError> {
        let row: Option<ResumeDocumentRow> =
            sqlx::query_as(
                r#"
                SELECT id, name, title, full_name, email, phone, sections,
                       experience, education, skills, projects
                FROM resume_documents
                WHERE id = $1
                "#,
            )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(DocumentModel::from)
            .ok_or(PersistenceError::NotFound(id))
    }

    async fn save(&self, id: Uuid, payload: &SavePayload) -> Result<(), PersistenceError> {
        // Rebuild the legacy view from the payload rather than trusting the caller.
        let mut doc = DocumentModel::from_parts(
            id,
            String::new(),
            payload.general.clone(),
            payload.sections.clone(),
            Default::default(),
        );
        legacy::sync(&mut doc);
        let flat = doc.legacy();

        let result = sqlx::query(
            r#"
            UPDATE resume_documents
            SET title = $2,
                full_name = $3,
                email = $4,
                phone = $5,
                sections = $6,
                experience = $7,
                education = $8,
                skills = $9,
                projects = $10,
                derived_content = CASE WHEN $11 THEN derived_content ELSE NULL END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&payload.general.title)
        .bind(&payload.general.full_name)
        .bind(&payload.general.email)
        .bind(&payload.general.phone)
        .bind(Json(&payload.sections))
        .bind(&flat.experience)
        .bind(&flat.education)
        .bind(&flat.skills)
        .bind(&flat.projects)
        .bind(payload.preserve_derived_content)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }

        debug!(
            "Saved document {id} ({} sections, preserve_derived_content={})",
            payload.sections.len(),
            payload.preserve_derived_content
        );
        Ok(())
    }
}
