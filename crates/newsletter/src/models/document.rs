//! Document model: a newsletter or eblast composed of ordered sections

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::section::{Background, Section, SectionContent, SectionId, SectionKind};
use super::{BrandId, Violation};
use crate::error::{ContentError, Result};

/// Unique identifier for a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub i64);

impl DocumentId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two document variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Newsletter,
    Eblast,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Newsletter => "newsletter",
            DocumentKind::Eblast => "eblast",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newsletter" | "newsletters" => Ok(DocumentKind::Newsletter),
            "eblast" | "eblasts" => Ok(DocumentKind::Eblast),
            other => Err(ContentError::field(
                "document_type",
                format!("unknown document type '{other}'"),
            )),
        }
    }
}

/// Variant-specific document data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentDetails {
    /// Monthly issue; may hold several event listings
    Newsletter { month: String, year: i32 },
    /// Single promotional offer
    Eblast {
        #[serde(default)]
        subject_line: Option<String>,
    },
}

/// A newsletter or eblast and its owned sections
///
/// Sections are kept in ordinal order and their positions are renumbered
/// after every mutation so they stay contiguous from 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Assigned by the store on create
    pub id: Option<DocumentId>,
    pub brand: BrandId,
    pub title: String,
    pub details: DocumentDetails,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    sections: Vec<Section>,
    /// Next section id to hand out; ids are never reused within a document
    next_section_id: u64,
}

impl Document {
    /// Create an empty draft newsletter
    pub fn newsletter(
        brand: impl Into<BrandId>,
        title: impl Into<String>,
        month: impl Into<String>,
        year: i32,
    ) -> Self {
        Self::draft(
            brand.into(),
            title.into(),
            DocumentDetails::Newsletter {
                month: month.into(),
                year,
            },
        )
    }

    /// Create an empty draft eblast
    pub fn eblast(
        brand: impl Into<BrandId>,
        title: impl Into<String>,
        subject_line: Option<String>,
    ) -> Self {
        Self::draft(
            brand.into(),
            title.into(),
            DocumentDetails::Eblast { subject_line },
        )
    }

    fn draft(brand: BrandId, title: String, details: DocumentDetails) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            brand,
            title,
            details,
            created_at: now,
            modified_at: now,
            sections: Vec::new(),
            next_section_id: 1,
        }
    }

    /// Rebuild a document from stored parts without re-checking invariants
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: DocumentId,
        brand: BrandId,
        title: String,
        details: DocumentDetails,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        sections: Vec<Section>,
        next_section_id: u64,
    ) -> Self {
        Self {
            id: Some(id),
            brand,
            title,
            details,
            created_at,
            modified_at,
            sections,
            next_section_id,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self.details {
            DocumentDetails::Newsletter { .. } => DocumentKind::Newsletter,
            DocumentDetails::Eblast { .. } => DocumentKind::Eblast,
        }
    }

    /// Sections in ordinal order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub(crate) fn next_section_id(&self) -> u64 {
        self.next_section_id
    }

    /// Sections sorted by position, ties kept in insertion (id) order
    ///
    /// Identical to `sections()` unless the document was loaded with
    /// non-contiguous positions.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut ordered: Vec<&Section> = self.sections.iter().collect();
        ordered.sort_by_key(|s| (s.position, s.id));
        ordered
    }

    /// Insert a section from a kind name and raw editor fields
    ///
    /// `position` of `None` appends. An optional `"background"` entry in
    /// `fields` sets the section's background override.
    pub fn add_section(
        &mut self,
        kind: &str,
        fields: &Value,
        position: Option<usize>,
    ) -> Result<SectionId> {
        let kind: SectionKind = kind.parse().map_err(|e: ContentError| e.in_document(self.id))?;
        let content =
            SectionContent::from_fields(kind, fields).map_err(|e| e.in_document(self.id))?;
        let background = background_field(fields).map_err(|e| e.in_document(self.id))?;
        self.insert(content, background, position)
    }

    /// Insert an already-typed section
    pub fn insert_section(
        &mut self,
        content: SectionContent,
        position: Option<usize>,
    ) -> Result<SectionId> {
        self.insert(content, None, position)
    }

    fn insert(
        &mut self,
        content: SectionContent,
        background: Option<String>,
        position: Option<usize>,
    ) -> Result<SectionId> {
        let index = position.unwrap_or(self.sections.len());
        if index > self.sections.len() {
            return Err(ContentError::field(
                "position",
                format!(
                    "position {index} is past the end of {} sections",
                    self.sections.len()
                ),
            )
            .in_document(self.id));
        }

        check_content(&content).map_err(|e| e.in_document(self.id))?;
        self.check_offer_limits(content.kind())?;

        let id = SectionId::new(self.next_section_id);
        let mut section = Section::new(id, index as u32, content);
        section.background = background;

        self.sections.insert(index, section);
        self.next_section_id += 1;
        self.renumber();
        Ok(id)
    }

    /// Replace a section's content in place; the kind can't change
    pub fn update_section(&mut self, id: SectionId, content: SectionContent) -> Result<()> {
        let doc_id = self.id;
        let section = self.section_mut(id)?;

        if section.kind() != content.kind() {
            return Err(ContentError::field(
                "kind",
                format!(
                    "section is a {}, can't replace it with {} content",
                    section.kind(),
                    content.kind()
                ),
            )
            .in_section(id)
            .in_document(doc_id));
        }
        check_content(&content).map_err(|e| e.in_section(id).in_document(doc_id))?;

        section.content = content;
        Ok(())
    }

    /// Replace a section's content from raw editor fields, parsed against its kind
    pub fn update_section_fields(&mut self, id: SectionId, fields: &Value) -> Result<()> {
        let doc_id = self.id;
        let kind = self.section_mut(id)?.kind();
        let content = SectionContent::from_fields(kind, fields)
            .map_err(|e| e.in_section(id).in_document(doc_id))?;
        let background =
            background_field(fields).map_err(|e| e.in_section(id).in_document(doc_id))?;

        self.update_section(id, content)?;
        if background.is_some() {
            self.section_mut(id)?.background = background;
        }
        Ok(())
    }

    /// Set or clear a section's background override
    pub fn set_section_background(&mut self, id: SectionId, background: Option<String>) -> Result<()> {
        if let Some(value) = &background {
            Background::parse(value).map_err(|message| {
                ContentError::field("background", message)
                    .in_section(id)
                    .in_document(self.id)
            })?;
        }
        self.section_mut(id)?.background = background;
        Ok(())
    }

    /// Include or skip a section when rendering
    pub fn set_section_enabled(&mut self, id: SectionId, enabled: bool) -> Result<()> {
        self.section_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Remove a section and close the ordinal gap
    pub fn remove_section(&mut self, id: SectionId) -> Result<Section> {
        let index = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| self.section_not_found(id))?;

        let removed = self.sections.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Reorder sections to match `new_order`, a permutation of the current ids
    pub fn reorder_sections(&mut self, new_order: &[SectionId]) -> Result<()> {
        let current: HashSet<SectionId> = self.sections.iter().map(|s| s.id).collect();
        let requested: HashSet<SectionId> = new_order.iter().copied().collect();

        if requested.len() != new_order.len() {
            return Err(ContentError::field("order", "new order repeats a section id")
                .in_document(self.id));
        }
        if requested != current {
            let mut missing: Vec<_> = current.difference(&requested).copied().collect();
            let mut unknown: Vec<_> = requested.difference(&current).copied().collect();
            missing.sort();
            unknown.sort();
            return Err(ContentError::field(
                "order",
                format!(
                    "new order must list every section exactly once (missing: {}, unknown: {})",
                    join_ids(&missing),
                    join_ids(&unknown)
                ),
            )
            .in_document(self.id));
        }

        let mut remaining = std::mem::take(&mut self.sections);
        for id in new_order {
            if let Some(index) = remaining.iter().position(|s| s.id == *id) {
                self.sections.push(remaining.swap_remove(index));
            }
        }
        self.renumber();
        Ok(())
    }

    /// Check every structural invariant; an empty result means valid
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.brand.as_str().trim().is_empty() {
            violations.push(Violation::fatal(None, "brand", "document must reference a brand"));
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.id) {
                violations.push(Violation::fatal(
                    Some(section.id),
                    "id",
                    "duplicate section id",
                ));
            }
            if section.id.get() >= self.next_section_id {
                violations.push(Violation::fatal(
                    Some(section.id),
                    "id",
                    format!("section id is not below the allocator ({})", self.next_section_id),
                ));
            }
        }

        let mut positions: Vec<u32> = self.sections.iter().map(|s| s.position).collect();
        positions.sort_unstable();
        let contiguous = positions.iter().enumerate().all(|(i, p)| *p as usize == i);
        if !contiguous {
            let has_ties = positions.windows(2).any(|w| w[0] == w[1]);
            let message = if has_ties {
                "duplicate positions; ties render in insertion order"
            } else {
                "positions are not contiguous from 0"
            };
            violations.push(Violation::recoverable(None, "position", message));
        }

        for section in &self.sections {
            for (field, message) in section.content.problems() {
                violations.push(Violation::fatal(Some(section.id), field, message));
            }
            if let Some(background) = &section.background {
                if let Err(message) = Background::parse(background) {
                    violations.push(Violation::fatal(Some(section.id), "background", message));
                }
            }
        }

        if self.kind() == DocumentKind::Eblast {
            for kind in [SectionKind::CallToAction, SectionKind::EventListing] {
                if self.count_kind(kind) > 1 {
                    violations.push(Violation::fatal(
                        None,
                        "sections",
                        format!("an eblast carries at most one {kind} section"),
                    ));
                }
            }
        }

        violations
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub(crate) fn set_timestamps(&mut self, created_at: DateTime<Utc>, modified_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.modified_at = modified_at;
    }

    fn section_mut(&mut self, id: SectionId) -> Result<&mut Section> {
        let not_found = self.section_not_found(id);
        self.sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(not_found)
    }

    fn section_not_found(&self, id: SectionId) -> ContentError {
        match self.id {
            Some(doc) => ContentError::not_found(format!("section {id} in document {doc}")),
            None => ContentError::not_found(format!("section {id}")),
        }
    }

    fn count_kind(&self, kind: SectionKind) -> usize {
        self.sections.iter().filter(|s| s.kind() == kind).count()
    }

    /// Eblasts promote a single offer: one CTA and one event listing at most
    fn check_offer_limits(&self, kind: SectionKind) -> Result<()> {
        let limited = matches!(kind, SectionKind::CallToAction | SectionKind::EventListing);
        if self.kind() == DocumentKind::Eblast && limited && self.count_kind(kind) >= 1 {
            return Err(ContentError::field(
                "kind",
                format!("an eblast carries at most one {kind} section"),
            )
            .in_document(self.id));
        }
        Ok(())
    }

    fn renumber(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.position = i as u32;
        }
    }
}

fn check_content(content: &SectionContent) -> Result<()> {
    match content.problems().into_iter().next() {
        Some((field, message)) => Err(ContentError::field(field, message)),
        None => Ok(()),
    }
}

fn background_field(fields: &Value) -> Result<Option<String>> {
    match fields.get("background") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            Background::parse(s).map_err(|message| ContentError::field("background", message))?;
            Ok(Some(s.trim().to_string()))
        }
        Some(_) => Err(ContentError::field("background", "must be a string")),
    }
}

fn join_ids(ids: &[SectionId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn newsletter() -> Document {
        Document::newsletter("aardvark", "Q3 Update", "September", 2025)
    }

    fn positions(doc: &Document) -> Vec<u32> {
        doc.sections().iter().map(|s| s.position).collect()
    }

    #[test]
    fn test_new_document_is_empty_draft() {
        let doc = newsletter();
        assert!(doc.id.is_none());
        assert!(doc.is_empty());
        assert_eq!(doc.kind(), DocumentKind::Newsletter);
        assert!(doc.is_valid());
    }

    #[test]
    fn test_add_section_appends_and_inserts() {
        let mut doc = newsletter();
        let a = doc.add_section("heading", &json!({"text": "Q3 Update"}), None).unwrap();
        let b = doc.add_section("body_text", &json!({"text": "Hello"}), None).unwrap();
        let c = doc
            .add_section("image", &json!({"asset": "banner.png", "alt": "banner"}), Some(1))
            .unwrap();

        assert_eq!(doc.section_ids(), vec![a, c, b]);
        assert_eq!(positions(&doc), vec![0, 1, 2]);
    }

    #[test]
    fn test_add_section_unknown_kind_leaves_document_unchanged() {
        let mut doc = newsletter();
        doc.add_section("heading", &json!({"text": "Title"}), None).unwrap();
        let before = doc.clone();

        let err = doc.add_section("marquee", &json!({"text": "x"}), None).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_section_missing_field() {
        let mut doc = newsletter();
        let err = doc.add_section("image", &json!({"asset": "a.png"}), None).unwrap_err();
        assert!(err.is_validation());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_add_section_position_past_end() {
        let mut doc = newsletter();
        let err = doc
            .add_section("heading", &json!({"text": "x"}), Some(1))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_add_section_background() {
        let mut doc = newsletter();
        let id = doc
            .add_section(
                "body_text",
                &json!({"text": "hi", "background": "secondary_bg"}),
                None,
            )
            .unwrap();
        assert_eq!(doc.section(id).unwrap().background.as_deref(), Some("secondary_bg"));

        let err = doc
            .add_section("body_text", &json!({"text": "hi", "background": "#zzz"}), None)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_update_section() {
        let mut doc = newsletter();
        let id = doc.insert_section(SectionContent::body_text("old"), None).unwrap();

        doc.update_section(id, SectionContent::body_text("new")).unwrap();
        assert_eq!(doc.section(id).unwrap().content, SectionContent::body_text("new"));

        let err = doc
            .update_section(id, SectionContent::heading("nope"))
            .unwrap_err();
        assert!(err.is_validation());

        let err = doc
            .update_section(SectionId::new(99), SectionContent::body_text("x"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_section_fields() {
        let mut doc = newsletter();
        let id = doc
            .insert_section(SectionContent::call_to_action("Shop", "https://example.com"), None)
            .unwrap();

        doc.update_section_fields(id, &json!({"label": "Buy", "url": "/buy", "background": "#fff"}))
            .unwrap();
        let section = doc.section(id).unwrap();
        assert_eq!(section.content, SectionContent::call_to_action("Buy", "/buy"));
        assert_eq!(section.background.as_deref(), Some("#fff"));

        let err = doc
            .update_section_fields(id, &json!({"label": "Buy", "url": "not a url"}))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_remove_section_twice() {
        let mut doc = newsletter();
        let a = doc.insert_section(SectionContent::heading("a"), None).unwrap();
        let b = doc.insert_section(SectionContent::body_text("b"), None).unwrap();
        let c = doc.insert_section(SectionContent::body_text("c"), None).unwrap();

        doc.remove_section(b).unwrap();
        assert_eq!(doc.section_ids(), vec![a, c]);
        assert_eq!(positions(&doc), vec![0, 1]);

        let err = doc.remove_section(b).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(doc.section_ids(), vec![a, c]);
    }

    #[test]
    fn test_section_ids_not_reused() {
        let mut doc = newsletter();
        let a = doc.insert_section(SectionContent::heading("a"), None).unwrap();
        doc.remove_section(a).unwrap();
        let b = doc.insert_section(SectionContent::heading("b"), None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_reorder_sections() {
        let mut doc = newsletter();
        let a = doc.insert_section(SectionContent::heading("a"), None).unwrap();
        let b = doc.insert_section(SectionContent::body_text("b"), None).unwrap();
        let c = doc.insert_section(SectionContent::body_text("c"), None).unwrap();

        doc.reorder_sections(&[c, a, b]).unwrap();
        assert_eq!(doc.section_ids(), vec![c, a, b]);
        assert_eq!(positions(&doc), vec![0, 1, 2]);

        let before = doc.clone();
        assert!(doc.reorder_sections(&[a, b]).unwrap_err().is_validation());
        assert!(doc.reorder_sections(&[a, b, b]).unwrap_err().is_validation());
        assert!(doc
            .reorder_sections(&[a, b, SectionId::new(42)])
            .unwrap_err()
            .is_validation());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_ordinals_stay_contiguous() {
        let mut doc = newsletter();
        let mut ids = Vec::new();
        for i in 0..6 {
            let position = if i % 2 == 0 { Some(0) } else { None };
            ids.push(
                doc.insert_section(SectionContent::body_text(format!("s{i}")), position)
                    .unwrap(),
            );
        }
        doc.remove_section(ids[2]).unwrap();
        doc.remove_section(ids[5]).unwrap();
        let mut order = doc.section_ids();
        order.reverse();
        doc.reorder_sections(&order).unwrap();
        doc.insert_section(SectionContent::heading("h"), Some(2)).unwrap();

        let expected: Vec<u32> = (0..doc.sections().len() as u32).collect();
        assert_eq!(positions(&doc), expected);
        assert!(doc.is_valid());
    }

    #[test]
    fn test_eblast_single_offer() {
        let mut doc = Document::eblast("project7", "Summer sale", Some("20% off".to_string()));
        doc.insert_section(SectionContent::call_to_action("Shop", "https://example.com"), None)
            .unwrap();
        let err = doc
            .insert_section(SectionContent::call_to_action("Again", "https://example.com"), None)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(doc.sections().len(), 1);

        let mut newsletter = newsletter();
        for _ in 0..2 {
            newsletter
                .insert_section(SectionContent::event_listing("Events", vec![]), None)
                .unwrap();
        }
        assert!(newsletter.is_valid());
    }

    #[test]
    fn test_validate_reports_stored_gaps_and_bad_content() {
        let sections = vec![
            Section::new(SectionId::new(1), 0, SectionContent::heading("a")),
            Section::new(SectionId::new(2), 3, SectionContent::body_text("b")),
            Section::new(
                SectionId::new(3),
                4,
                SectionContent::call_to_action("Go", "nowhere"),
            )
            .with_background("#12"),
        ];
        let doc = Document::from_parts(
            DocumentId::new(1),
            BrandId::new("aardvark"),
            "t".to_string(),
            DocumentDetails::Eblast { subject_line: None },
            Utc::now(),
            Utc::now(),
            sections,
            4,
        );

        let violations = doc.validate();
        let gap = violations.iter().find(|v| v.field == "position").unwrap();
        assert!(gap.recoverable);
        assert!(violations
            .iter()
            .any(|v| v.field == "url" && !v.recoverable && v.section == Some(SectionId::new(3))));
        assert!(violations.iter().any(|v| v.field == "background"));
    }

    #[test]
    fn test_ordered_sections_breaks_ties_by_id() {
        let sections = vec![
            Section::new(SectionId::new(2), 0, SectionContent::body_text("second")),
            Section::new(SectionId::new(1), 0, SectionContent::body_text("first")),
        ];
        let doc = Document::from_parts(
            DocumentId::new(1),
            BrandId::new("aardvark"),
            "t".to_string(),
            DocumentDetails::Newsletter {
                month: "May".to_string(),
                year: 2025,
            },
            Utc::now(),
            Utc::now(),
            sections,
            3,
        );
        let ids: Vec<_> = doc.ordered_sections().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SectionId::new(1), SectionId::new(2)]);
        assert!(doc.validate().iter().all(|v| v.recoverable));
    }

    #[test]
    fn test_document_kind_parse() {
        assert_eq!("Newsletters".parse::<DocumentKind>().unwrap(), DocumentKind::Newsletter);
        assert_eq!("eblast".parse::<DocumentKind>().unwrap(), DocumentKind::Eblast);
        assert!("flyer".parse::<DocumentKind>().is_err());
    }
}
