//! Storage trait definitions

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};
use crate::models::{Asset, AssetId, BrandId, Document, DocumentId, DocumentKind};

/// Current layout of [`StoreSnapshot`]
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Trait for document storage operations
///
/// Every mutating operation is atomic per document: a document and its
/// sections are written together or not at all, and readers never observe a
/// partial section list.
pub trait DocumentStore: Send + Sync {
    /// Persist a new document, assigning its id and timestamps in place
    fn create(&self, document: &mut Document) -> Result<DocumentId>;

    /// Load a fully hydrated document, sections in ordinal order
    fn get(&self, id: DocumentId) -> Result<Document>;

    /// Replace the stored document and its whole section set
    ///
    /// The new modification timestamp is written back into `document`.
    fn update(&self, document: &mut Document) -> Result<()>;

    /// Delete a document and all its sections; unknown ids are `NotFound`
    fn delete(&self, id: DocumentId) -> Result<()>;

    /// One page of summaries, most recently modified first
    fn list_page(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentSummary>>;

    /// Up to `limit` summaries strictly inside `range`, most recently modified first
    ///
    /// Unlike [`DocumentStore::list_page`] the window is keyed on
    /// `(modified_at, id)`, so writes between calls never shift it.
    fn list_range(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        range: &ListRange,
        limit: usize,
    ) -> Result<Vec<DocumentSummary>>;

    /// Record an imported asset for an existing document, assigning its id
    fn add_asset(&self, asset: &mut Asset) -> Result<AssetId>;

    /// Assets recorded for a document, oldest first
    fn assets(&self, document: DocumentId) -> Result<Vec<Asset>>;

    /// Read every document at a single consistent point in time
    fn snapshot(&self) -> Result<StoreSnapshot>;

    /// Replace the entire store content with a snapshot, atomically
    fn restore(&self, snapshot: &StoreSnapshot) -> Result<()>;

    /// Check that the backing store is reachable
    fn ping(&self) -> Result<()>;

    /// Document and section counts plus the backing location
    fn status(&self) -> Result<StoreStatus>;
}

/// Listing entry for a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub title: String,
    pub brand: BrandId,
    pub modified_at: DateTime<Utc>,
    pub section_count: usize,
}

impl DocumentSummary {
    pub fn key(&self) -> ListKey {
        ListKey {
            modified_at: self.modified_at,
            id: self.id,
        }
    }
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.unwrap_or(DocumentId::new(0)),
            kind: document.kind(),
            title: document.title.clone(),
            brand: document.brand.clone(),
            modified_at: document.modified_at,
            section_count: document.sections().len(),
        }
    }
}

/// Position in the listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListKey {
    pub modified_at: DateTime<Utc>,
    pub id: DocumentId,
}

/// Exclusive bounds on [`ListKey`]; `None` leaves a side open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListRange {
    /// Only keys strictly below this one
    pub before: Option<ListKey>,
    /// Only keys strictly above this one
    pub after: Option<ListKey>,
}

impl ListRange {
    pub fn contains(&self, key: &ListKey) -> bool {
        self.before.is_none_or(|b| *key < b) && self.after.is_none_or(|a| *key > a)
    }
}

/// Counts and location reported by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub newsletters: usize,
    pub eblasts: usize,
    pub sections: usize,
    pub assets: usize,
    /// Database path, or "memory"
    pub location: String,
    /// Size of the backing file when file-backed
    pub size_bytes: Option<u64>,
}

impl StoreStatus {
    pub fn documents(&self) -> usize {
        self.newsletters + self.eblasts
    }
}

/// Every document and asset record in the store at one point in time
///
/// Asset files themselves live in the asset library directory and are not
/// part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub format_version: u32,
    pub taken_at: DateTime<Utc>,
    /// Documents ordered by id
    pub documents: Vec<Document>,
    /// Asset records ordered by id
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl StoreSnapshot {
    pub fn new(documents: Vec<Document>, assets: Vec<Asset>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            taken_at: Utc::now(),
            documents,
            assets,
        }
    }

    pub fn section_count(&self) -> usize {
        self.documents.iter().map(|d| d.sections().len()).sum()
    }

    /// Reject snapshots a store can't restore faithfully
    pub fn check(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(ContentError::validation(format!(
                "unsupported snapshot format version {}",
                self.format_version
            )));
        }
        let mut ids = std::collections::HashSet::new();
        for document in &self.documents {
            let id = document
                .id
                .ok_or_else(|| ContentError::validation("snapshot document without an id"))?;
            if !ids.insert(id) {
                return Err(ContentError::validation(format!(
                    "snapshot repeats document {id}"
                )));
            }
            ensure_storable(document)?;
        }

        let mut asset_ids = std::collections::HashSet::new();
        for asset in &self.assets {
            let id = asset
                .id
                .ok_or_else(|| ContentError::validation("snapshot asset without an id"))?;
            if !asset_ids.insert(id) {
                return Err(ContentError::validation(format!("snapshot repeats asset {id}")));
            }
            if !ids.contains(&asset.document_id) {
                return Err(ContentError::validation(format!(
                    "snapshot asset {id} belongs to missing document {}",
                    asset.document_id
                )));
            }
        }
        Ok(())
    }
}

/// Refuse to persist documents that break any invariant
pub(crate) fn ensure_storable(document: &Document) -> Result<()> {
    match document.validate().into_iter().next() {
        Some(violation) => Err(violation.into_validation_error().in_document(document.id)),
        None => Ok(()),
    }
}

/// Modification stamp for a save, later than every stamp already stored
///
/// Keeps a saved document at the head of the listing even when the clock
/// hasn't advanced since the previous save.
pub(crate) fn next_stamp(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match latest {
        Some(latest) if latest >= now => latest + TimeDelta::nanoseconds(1),
        _ => now,
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ContentError::storage(format!("corrupt timestamp '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let stored = format_timestamp(&now);
        assert!(stored.ends_with('Z'));
        assert_eq!(parse_timestamp(&stored).unwrap(), now);
        assert!(parse_timestamp("yesterday").unwrap_err().is_storage());
    }

    #[test]
    fn test_snapshot_check() {
        let mut doc = Document::newsletter("aardvark", "t", "May", 2025);
        let snapshot = StoreSnapshot::new(vec![doc.clone()], Vec::new());
        assert!(snapshot.check().unwrap_err().is_validation());

        doc.id = Some(DocumentId::new(1));
        let snapshot = StoreSnapshot::new(vec![doc.clone(), doc], Vec::new());
        assert!(snapshot.check().unwrap_err().to_string().contains("repeats"));
    }

    #[test]
    fn test_snapshot_check_orphan_asset() {
        let mut doc = Document::newsletter("aardvark", "t", "May", 2025);
        doc.id = Some(DocumentId::new(1));
        let asset = Asset {
            id: Some(AssetId::new(1)),
            document_id: DocumentId::new(2),
            section_id: None,
            file_name: "2-abc.png".to_string(),
            original_name: "banner.png".to_string(),
            size_bytes: 10,
            created_at: Utc::now(),
        };
        let snapshot = StoreSnapshot::new(vec![doc], vec![asset]);
        assert!(snapshot.check().unwrap_err().to_string().contains("missing document"));
    }

    #[test]
    fn test_list_range_contains() {
        let at = Utc::now();
        let key = |id| ListKey {
            modified_at: at,
            id: DocumentId::new(id),
        };
        let range = ListRange {
            before: Some(key(5)),
            after: Some(key(2)),
        };
        assert!(range.contains(&key(3)));
        assert!(!range.contains(&key(5)));
        assert!(!range.contains(&key(2)));
        assert!(ListRange::default().contains(&key(9)));
    }

    #[test]
    fn test_next_stamp_is_strictly_later() {
        let ahead = Utc::now() + TimeDelta::seconds(60);
        assert_eq!(next_stamp(Some(ahead)), ahead + TimeDelta::nanoseconds(1));

        let behind = Utc::now() - TimeDelta::seconds(60);
        assert!(next_stamp(Some(behind)) > behind);
        assert!(next_stamp(None) > behind);
    }
}
