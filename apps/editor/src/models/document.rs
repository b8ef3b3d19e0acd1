use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::document::{DocumentModel, GeneralData, LegacyFields, Section};

/// Columns of `resume_documents` the editor reads. Older rows carry only the four
/// flat legacy columns and an empty `sections` array; `derived_content` and
/// `updated_at` are written on save but never read back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeDocumentRow {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub sections: Json<Vec<Section>>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub skills: Option<String>,
    pub projects: Option<String>,
}

impl From<ResumeDocumentRow> for DocumentModel {
    fn from(row: ResumeDocumentRow) -> Self {
        DocumentModel::from_parts(
            row.id,
            row.name,
            GeneralData {
                title: row.title,
                full_name: row.full_name,
                email: row.email,
                phone: row.phone,
            },
            row.sections.0,
            LegacyFields {
                experience: row.experience.unwrap_or_default(),
                education: row.education.unwrap_or_default(),
                skills: row.skills.unwrap_or_default(),
                projects: row.projects.unwrap_or_default(),
            },
        )
    }
}
