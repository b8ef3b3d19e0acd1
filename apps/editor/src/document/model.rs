//! Document Model — fixed general fields plus an ordered collection of named sections.
//!
//! The section collection is authoritative. `legacy` is a derived view kept in step
//! by `legacy::derive` after every mutator, so callers reading either schema see the
//! same content.
//!
//! `order` values are relative between reorders: removal leaves gaps, explicit orders
//! may tie. `ordered_sections` breaks ties by insertion sequence, and the reorder
//! engine renumbers to a dense `1..N` sequence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::document::legacy::{self, LegacyFields};
use crate::document::reorder::{self, Reorder};
use crate::errors::EditorError;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralData {
    pub title: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralField {
    Title,
    FullName,
    Email,
    Phone,
}

impl GeneralData {
    pub fn set(&mut self, field: GeneralField, value: String) {
        match field {
            GeneralField::Title => self.title = value,
            GeneralField::FullName => self.full_name = value,
            GeneralField::Email => self.email = value,
            GeneralField::Phone => self.phone = value,
        }
    }
}

/// One named block of opaque content. `key` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub content: String,
    pub order: i32,
}

/// Partial update for `upsert_section`. `None` leaves the existing value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i32>,
}

/// Content-identity fingerprint (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// In-memory representation of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    pub id: Uuid,
    pub name: String,
    general: GeneralData,
    /// Insertion sequence; doubles as the tie-breaker for equal orders.
    sections: Vec<Section>,
    index: HashMap<String, usize>,
    legacy: LegacyFields,
}

// ────────────────────────────────────────────────────────────────────────────
// Construction and reads
// ────────────────────────────────────────────────────────────────────────────

impl DocumentModel {
    /// A fresh, empty document (the external "create new document" action).
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self::from_parts(
            id,
            name.into(),
            GeneralData::default(),
            Vec::new(),
            LegacyFields::default(),
        )
    }

    /// Reassembles a document as persisted. The legacy fields are taken as given so
    /// `legacy::upgrade_on_load` can inspect them before the first sync. A key stored
    /// twice keeps its first position and its last content.
    pub fn from_parts(
        id: Uuid,
        name: String,
        general: GeneralData,
        sections: Vec<Section>,
        legacy: LegacyFields,
    ) -> Self {
        let mut doc = Self {
            id,
            name,
            general,
            sections: Vec::with_capacity(sections.len()),
            index: HashMap::new(),
            legacy,
        };
        for section in sections {
            match doc.index.get(&section.key).copied() {
                Some(i) => {
                    warn!(
                        "Document {} stores section '{}' more than once; keeping the last copy",
                        doc.id, section.key
                    );
                    if let Some(slot) = doc.sections.get_mut(i) {
                        *slot = section;
                    }
                }
                None => doc.push_section(section),
            }
        }
        doc
    }

    pub fn general(&self) -> &GeneralData {
        &self.general
    }

    pub fn legacy(&self) -> &LegacyFields {
        &self.legacy
    }

    /// Sections in insertion sequence.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.index.get(key).and_then(|&i| self.sections.get(i))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections sorted by `order`, ties broken by insertion sequence.
    pub fn ordered_sections(&self) -> Vec<Section> {
        reorder::sorted(&self.sections)
    }

    pub fn ordered_keys(&self) -> Vec<String> {
        self.ordered_sections().into_iter().map(|s| s.key).collect()
    }

    /// SHA-256 over name, general fields and every section, length-prefixed so
    /// field boundaries cannot collide.
    pub fn digest(&self) -> ContentDigest {
        let mut hasher = Sha256::new();
        let mut feed = |value: &str| {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        };
        feed(&self.name);
        feed(&self.general.title);
        feed(&self.general.full_name);
        feed(&self.general.email);
        feed(&self.general.phone);
        for section in &self.sections {
            feed(&section.key);
            feed(&section.title);
            feed(&section.content);
            feed(&section.order.to_string());
        }
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// One past the highest order in use.
    fn next_order(&self) -> Result<i32, EditorError> {
        self.sections
            .iter()
            .map(|s| s.order)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| {
                EditorError::Validation(
                    "section order is at its maximum; reorder before appending".to_string(),
                )
            })
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key.clone(), i))
            .collect();
    }

    pub(crate) fn replace_legacy(&mut self, legacy: LegacyFields) {
        self.legacy = legacy;
    }

    pub(crate) fn push_section(&mut self, section: Section) {
        self.index.insert(section.key.clone(), self.sections.len());
        self.sections.push(section);
    }

    pub(crate) fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mutators
// ────────────────────────────────────────────────────────────────────────────

impl DocumentModel {
    pub fn set_general_field(&mut self, field: GeneralField, value: impl Into<String>) {
        self.general.set(field, value.into());
    }

    /// Partial update when `key` exists, creation otherwise.
    pub fn upsert_section(&mut self, key: &str, patch: SectionPatch) -> Result<(), EditorError> {
        validate_key(key)?;
        if let Some(content) = &patch.content {
            validate_content(content)?;
        }

        match self.index.get(key).copied() {
            Some(i) => {
                if let Some(section) = self.sections.get_mut(i) {
                    if let Some(title) = patch.title {
                        section.title = title;
                    }
                    if let Some(content) = patch.content {
                        section.content = content;
                    }
                    if let Some(order) = patch.order {
                        section.order = order;
                    }
                }
            }
            None => {
                let order = match patch.order {
                    Some(order) => order,
                    None => self.next_order()?,
                };
                self.push_section(Section {
                    key: key.to_string(),
                    title: patch.title.unwrap_or_else(|| default_title(key)),
                    content: patch.content.unwrap_or_default(),
                    order,
                });
            }
        }

        if legacy::is_reserved(key) {
            self.legacy = legacy::derive(self);
        }
        Ok(())
    }

    /// Strict creation: an existing key is an error rather than an overwrite.
    pub fn add_section(
        &mut self,
        key: &str,
        title: impl Into<String>,
        initial_content: impl Into<String>,
    ) -> Result<(), EditorError> {
        validate_key(key)?;
        if self.contains(key) {
            return Err(EditorError::DuplicateKey(key.to_string()));
        }
        self.upsert_section(
            key,
            SectionPatch {
                title: Some(title.into()),
                content: Some(initial_content.into()),
                order: None,
            },
        )
    }

    /// Hot path for the rich-text widget: index lookup, no sort, no full legacy rebuild.
    pub fn update_section_content(
        &mut self,
        key: &str,
        content: impl Into<String>,
    ) -> Result<(), EditorError> {
        let content = content.into();
        validate_content(&content)?;
        let i = self.position(key)?;
        if let Some(section) = self.sections.get_mut(i) {
            if legacy::is_reserved(key) {
                self.legacy.mirror(key, &content);
            }
            section.content = content;
        }
        Ok(())
    }

    pub fn rename_section(&mut self, key: &str, title: impl Into<String>) -> Result<(), EditorError> {
        let i = self.position(key)?;
        if let Some(section) = self.sections.get_mut(i) {
            section.title = title.into();
        }
        Ok(())
    }

    /// Removes a section without renumbering the rest.
    pub fn remove_section(&mut self, key: &str) -> Result<Section, EditorError> {
        let i = self.position(key)?;
        let removed = self.sections.remove(i);
        self.index.remove(key);
        for (j, section) in self.sections.iter().enumerate().skip(i) {
            self.index.insert(section.key.clone(), j);
        }
        if legacy::is_reserved(key) {
            self.legacy.mirror(key, "");
        }
        Ok(removed)
    }

    /// Applies a reorder and stores the sections in their new dense order.
    pub fn apply_reorder(&mut self, request: &Reorder) -> Result<(), EditorError> {
        self.sections = reorder::reorder(&self.sections, request)?;
        self.rebuild_index();
        Ok(())
    }

    fn position(&self, key: &str) -> Result<usize, EditorError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| EditorError::NotFound(format!("section '{key}'")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation helpers
// ────────────────────────────────────────────────────────────────────────────

/// Section keys are lowercase ASCII letters, digits and underscores.
pub fn validate_key(key: &str) -> Result<(), EditorError> {
    if key.is_empty() {
        return Err(EditorError::Validation(
            "section key must not be empty".to_string(),
        ));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(EditorError::Validation(format!(
            "section key '{key}' may only contain lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Content is opaque markup; the only rule is that it is a plain string without NULs.
pub fn validate_content(content: &str) -> Result<(), EditorError> {
    if content.contains('\0') {
        return Err(EditorError::Validation(
            "section content must not contain NUL characters".to_string(),
        ));
    }
    Ok(())
}

/// Title given to a section created without one.
pub fn default_title(key: &str) -> String {
    if let Some(title) = legacy::reserved_title(key) {
        return title.to_string();
    }
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().to_string() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DocumentModel {
        DocumentModel::new(Uuid::nil(), "Backend resume")
    }

    fn patch(content: &str) -> SectionPatch {
        SectionPatch {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_format_rules() {
        assert!(validate_key("open_source_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("Skills").is_err());
        assert!(validate_key("side-projects").is_err());
        assert!(validate_key("über").is_err());
    }

    #[test]
    fn test_upsert_appends_after_max_order() {
        let mut d = doc();
        d.upsert_section(
            "summary",
            SectionPatch {
                order: Some(7),
                ..Default::default()
            },
        )
        .unwrap();
        d.upsert_section("awards", SectionPatch::default()).unwrap();
        assert_eq!(d.section("awards").unwrap().order, 8);
        assert_eq!(d.section("awards").unwrap().title, "Awards");
    }

    #[test]
    fn test_upsert_twice_second_call_wins() {
        let mut d = doc();
        d.upsert_section("skills", patch("<p>Rust</p>")).unwrap();
        d.upsert_section("skills", patch("<p>Rust, Go</p>")).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.section("skills").unwrap().content, "<p>Rust, Go</p>");
    }

    #[test]
    fn test_upsert_is_partial() {
        let mut d = doc();
        d.add_section("summary", "Summary", "<p>hi</p>").unwrap();
        d.upsert_section(
            "summary",
            SectionPatch {
                title: Some("Profile".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let s = d.section("summary").unwrap();
        assert_eq!(s.title, "Profile");
        assert_eq!(s.content, "<p>hi</p>");
    }

    #[test]
    fn test_upsert_rejects_bad_key() {
        let mut d = doc();
        let err = d.upsert_section("My Section", SectionPatch::default()).unwrap_err();
        assert!(matches!(err, EditorError::Validation(_)));
        assert!(d.is_empty());
    }

    #[test]
    fn test_add_section_twice_is_duplicate() {
        let mut d = doc();
        d.add_section("skills", "Skills", "").unwrap();
        let err = d.add_section("skills", "Skills", "").unwrap_err();
        assert_eq!(err, EditorError::DuplicateKey("skills".into()));
    }

    #[test]
    fn test_rename_keeps_key() {
        let mut d = doc();
        d.add_section("experience", "Experience", "").unwrap();
        d.rename_section("experience", "Work History").unwrap();
        let s = d.section("experience").unwrap();
        assert_eq!(s.key, "experience");
        assert_eq!(s.title, "Work History");
    }

    #[test]
    fn test_remove_leaves_gap_until_reorder() {
        let mut d = doc();
        d.add_section("a", "A", "").unwrap();
        d.add_section("b", "B", "").unwrap();
        d.add_section("c", "C", "").unwrap();
        d.remove_section("b").unwrap();
        let orders: Vec<i32> = d.ordered_sections().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 3]);
        assert_eq!(d.section("c").unwrap().key, "c");
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let mut d = doc();
        assert!(matches!(
            d.remove_section("skills"),
            Err(EditorError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_content_missing_is_not_found() {
        let mut d = doc();
        assert!(matches!(
            d.update_section_content("skills", "x"),
            Err(EditorError::NotFound(_))
        ));
    }

    #[test]
    fn test_content_with_nul_rejected() {
        let mut d = doc();
        d.add_section("summary", "Summary", "").unwrap();
        assert!(matches!(
            d.update_section_content("summary", "a\0b"),
            Err(EditorError::Validation(_))
        ));
    }

    #[test]
    fn test_ties_broken_by_insertion() {
        let mut d = doc();
        for key in ["x", "y", "z"] {
            d.upsert_section(
                key,
                SectionPatch {
                    order: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        assert_eq!(d.ordered_keys(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut d = doc();
        d.add_section("summary", "Summary", "<p>a</p>").unwrap();
        let before = d.digest();
        assert_eq!(before, d.clone().digest());
        d.update_section_content("summary", "<p>b</p>").unwrap();
        assert_ne!(before, d.digest());
        assert_eq!(d.digest().as_str().len(), 64);
    }

    #[test]
    fn test_digest_field_boundaries() {
        let mut a = doc();
        a.set_general_field(GeneralField::Title, "ab");
        let mut b = doc();
        b.set_general_field(GeneralField::Title, "a");
        b.set_general_field(GeneralField::FullName, "b");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_default_title_for_custom_key() {
        assert_eq!(default_title("open_source"), "Open Source");
        assert_eq!(default_title("projects"), "Projects");
    }

    #[test]
    fn test_append_after_max_order_overflow_is_validation() {
        let mut d = doc();
        d.upsert_section(
            "summary",
            SectionPatch {
                order: Some(i32::MAX),
                ..Default::default()
            },
        )
        .unwrap();
        let err = d.upsert_section("awards", SectionPatch::default()).unwrap_err();
        assert!(matches!(err, EditorError::Validation(_)));
        assert!(!d.contains("awards"));

        d.apply_reorder(&Reorder::Explicit(vec!["summary".into()])).unwrap();
        d.upsert_section("awards", SectionPatch::default()).unwrap();
        assert_eq!(d.section("awards").unwrap().order, 2);
    }

    #[test]
    fn test_duplicate_stored_keys_collapse_on_load() {
        let section = |content: &str, order| Section {
            key: "skills".into(),
            title: "Skills".into(),
            content: content.into(),
            order,
        };
        let mut d = DocumentModel::from_parts(
            Uuid::nil(),
            "Dup".into(),
            GeneralData::default(),
            vec![
                section("<p>old</p>", 1),
                Section {
                    key: "summary".into(),
                    title: "Summary".into(),
                    content: String::new(),
                    order: 2,
                },
                section("<p>new</p>", 3),
            ],
            LegacyFields::default(),
        );
        assert_eq!(d.len(), 2);
        assert_eq!(d.section("skills").unwrap().content, "<p>new</p>");
        d.apply_reorder(&Reorder::Explicit(vec!["summary".into(), "skills".into()]))
            .unwrap();
        assert_eq!(d.ordered_keys(), vec!["summary", "skills"]);
    }
}
