//! Legacy Bridge — keeps the four flat legacy fields in step with their reserved sections.
//!
//! Older documents stored `experience`, `education`, `skills` and `projects` as flat
//! columns. Newer documents store an ordered section list. The section list wins;
//! the flat fields are always re-derived from it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::model::{DocumentModel, Section, SectionPatch};
use crate::errors::EditorError;

/// Reserved keys in their canonical slot order, with the titles used when a
/// section has to be synthesized.
pub const RESERVED_SECTIONS: [(&str, &str); 4] = [
    ("experience", "Experience"),
    ("education", "Education"),
    ("skills", "Skills"),
    ("projects", "Projects"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFields {
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub projects: String,
}

impl LegacyFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "experience" => Some(&self.experience),
            "education" => Some(&self.education),
            "skills" => Some(&self.skills),
            "projects" => Some(&self.projects),
            _ => None,
        }
    }

    /// Copies `content` into the slot for `key`. Non-reserved keys are ignored.
    pub fn mirror(&mut self, key: &str, content: &str) {
        let slot = match key {
            "experience" => &mut self.experience,
            "education" => &mut self.education,
            "skills" => &mut self.skills,
            "projects" => &mut self.projects,
            _ => return,
        };
        slot.clear();
        slot.push_str(content);
    }

    pub fn is_empty(&self) -> bool {
        RESERVED_SECTIONS
            .iter()
            .all(|(key, _)| self.get(key).map_or(true, str::is_empty))
    }
}

pub fn is_reserved(key: &str) -> bool {
    reserved_title(key).is_some()
}

pub fn reserved_title(key: &str) -> Option<&'static str> {
    RESERVED_SECTIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, title)| *title)
}

/// Rebuilds the legacy view from the reserved sections (empty when absent).
pub fn derive(doc: &DocumentModel) -> LegacyFields {
    let mut legacy = LegacyFields::default();
    for (key, _) in RESERVED_SECTIONS {
        if let Some(section) = doc.section(key) {
            legacy.mirror(key, &section.content);
        }
    }
    legacy
}

/// Re-derives `doc.legacy` in place.
pub fn sync(doc: &mut DocumentModel) {
    let legacy = derive(doc);
    doc.replace_legacy(legacy);
}

/// One-time upgrade of a freshly loaded document that still carries flat content.
///
/// A legacy-only document (flat fields set, no reserved section) gets all four
/// reserved sections synthesized with default titles at orders 1..4; custom sections
/// already present are shifted to follow them. In a partly migrated document, each
/// flat field with content but no matching section is recovered as a section appended
/// after the others, so the following `sync` cannot blank it.
///
/// Always finishes with `sync`. Returns whether any section was synthesized; a second
/// run finds the sections present and returns `false`.
pub fn upgrade_on_load(doc: &mut DocumentModel) -> Result<bool, EditorError> {
    let flat = doc.legacy().clone();
    let upgraded = if flat.is_empty() {
        false
    } else if RESERVED_SECTIONS.iter().any(|(key, _)| doc.contains(key)) {
        recover_orphans(doc, &flat)?
    } else {
        synthesize_all(doc, &flat)?;
        true
    };

    sync(doc);
    Ok(upgraded)
}

fn synthesize_all(doc: &mut DocumentModel, flat: &LegacyFields) -> Result<(), EditorError> {
    let slots = RESERVED_SECTIONS.len() as i32;
    for section in doc.sections_mut() {
        section.order = section.order.checked_add(slots).ok_or_else(|| {
            EditorError::Validation(format!(
                "section '{}' order {} cannot be shifted past the reserved sections",
                section.key, section.order
            ))
        })?;
    }
    for (order, (key, title)) in (1..).zip(RESERVED_SECTIONS) {
        doc.push_section(Section {
            key: key.to_string(),
            title: title.to_string(),
            content: flat.get(key).unwrap_or_default().to_string(),
            order,
        });
    }
    info!(
        "Upgraded legacy-only document {} to {} sections",
        doc.id,
        doc.len()
    );
    Ok(())
}

fn recover_orphans(doc: &mut DocumentModel, flat: &LegacyFields) -> Result<bool, EditorError> {
    let mut recovered = false;
    for (key, _) in RESERVED_SECTIONS {
        let content = flat.get(key).unwrap_or_default();
        if content.is_empty() || doc.contains(key) {
            continue;
        }
        warn!(
            "Document {} has flat '{key}' content without a section; recovering it",
            doc.id
        );
        doc.upsert_section(
            key,
            SectionPatch {
                content: Some(content.to_string()),
                ..Default::default()
            },
        )?;
        recovered = true;
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::GeneralData;
    use uuid::Uuid;

    fn legacy_only() -> DocumentModel {
        DocumentModel::from_parts(
            Uuid::nil(),
            "Imported".into(),
            GeneralData::default(),
            Vec::new(),
            LegacyFields {
                experience: "<p>Acme, 2019-2023</p>".into(),
                education: "<p>BSc CS</p>".into(),
                skills: "<p>Rust</p>".into(),
                projects: String::new(),
            },
        )
    }

    #[test]
    fn test_upgrade_synthesizes_reserved_sections() {
        let mut doc = legacy_only();
        assert!(upgrade_on_load(&mut doc).unwrap());
        assert_eq!(
            doc.ordered_keys(),
            vec!["experience", "education", "skills", "projects"]
        );
        assert_eq!(doc.section("experience").unwrap().content, "<p>Acme, 2019-2023</p>");
        assert_eq!(doc.section("skills").unwrap().title, "Skills");
        assert_eq!(doc.section("projects").unwrap().content, "");
        assert_eq!(doc.section("projects").unwrap().order, 4);
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let mut doc = legacy_only();
        assert!(upgrade_on_load(&mut doc).unwrap());
        let once = doc.clone();
        assert!(!upgrade_on_load(&mut doc).unwrap());
        assert_eq!(doc, once);
    }

    #[test]
    fn test_upgrade_shifts_custom_sections_after_reserved() {
        let mut doc = DocumentModel::from_parts(
            Uuid::nil(),
            "Imported".into(),
            GeneralData::default(),
            vec![Section {
                key: "summary".into(),
                title: "Summary".into(),
                content: String::new(),
                order: 1,
            }],
            LegacyFields {
                skills: "<p>Go</p>".into(),
                ..Default::default()
            },
        );
        assert!(upgrade_on_load(&mut doc).unwrap());
        assert_eq!(doc.ordered_keys().last().map(String::as_str), Some("summary"));
    }

    #[test]
    fn test_no_upgrade_for_empty_legacy() {
        let mut doc = DocumentModel::new(Uuid::nil(), "Blank");
        assert!(!upgrade_on_load(&mut doc).unwrap());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_sections_win_over_stale_legacy() {
        let mut doc = DocumentModel::from_parts(
            Uuid::nil(),
            "Mixed".into(),
            GeneralData::default(),
            vec![Section {
                key: "skills".into(),
                title: "Skills".into(),
                content: "<p>new</p>".into(),
                order: 1,
            }],
            LegacyFields {
                skills: "<p>old</p>".into(),
                education: "<p>orphan</p>".into(),
                ..Default::default()
            },
        );
        assert!(upgrade_on_load(&mut doc).unwrap());
        assert_eq!(doc.legacy().skills, "<p>new</p>");
        assert_eq!(doc.ordered_keys(), vec!["skills", "education"]);
        assert_eq!(doc.section("education").unwrap().content, "<p>orphan</p>");
        assert_eq!(doc.section("education").unwrap().title, "Education");
        assert_eq!(doc.legacy().education, "<p>orphan</p>");
        assert!(!doc.contains("experience"));
    }

    #[test]
    fn test_stale_legacy_with_all_sections_present_is_not_an_upgrade() {
        let mut doc = legacy_only();
        upgrade_on_load(&mut doc).unwrap();
        doc.replace_legacy(LegacyFields {
            skills: "<p>stale</p>".into(),
            ..Default::default()
        });
        assert!(!upgrade_on_load(&mut doc).unwrap());
        assert_eq!(doc.legacy().skills, "<p>Rust</p>");
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_upgrade_rejects_order_that_cannot_shift() {
        let mut doc = DocumentModel::from_parts(
            Uuid::nil(),
            "Imported".into(),
            GeneralData::default(),
            vec![Section {
                key: "summary".into(),
                title: "Summary".into(),
                content: String::new(),
                order: i32::MAX - 1,
            }],
            LegacyFields {
                skills: "<p>Go</p>".into(),
                ..Default::default()
            },
        );
        assert!(matches!(
            upgrade_on_load(&mut doc),
            Err(EditorError::Validation(_))
        ));
    }

    #[test]
    fn test_legacy_mirrors_every_mutator() {
        let mut doc = DocumentModel::new(Uuid::nil(), "Live");
        doc.add_section("skills", "Skills", "<p>a</p>").unwrap();
        assert_eq!(doc.legacy().skills, "<p>a</p>");

        doc.update_section_content("skills", "<p>b</p>").unwrap();
        assert_eq!(doc.legacy().skills, "<p>b</p>");

        doc.upsert_section(
            "skills",
            SectionPatch {
                content: Some("<p>c</p>".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(doc.legacy().skills, "<p>c</p>");

        doc.add_section("summary", "Summary", "<p>not mirrored</p>").unwrap();
        assert_eq!(doc.legacy(), &derive(&doc));

        doc.remove_section("skills").unwrap();
        assert_eq!(doc.legacy().skills, "");
        assert_eq!(doc.legacy(), &derive(&doc));
    }
}
