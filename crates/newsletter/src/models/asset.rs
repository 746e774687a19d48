//! Uploaded image assets

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DocumentId, SectionId};

/// Unique identifier for a stored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub i64);

impl AssetId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file copied into the asset library for one document
///
/// `file_name` is the library-unique name and doubles as the reference an
/// image section stores in its `asset` field. Records go away with their
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Assigned by the store
    pub id: Option<AssetId>,
    pub document_id: DocumentId,
    /// Section the upload was made for, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    pub file_name: String,
    /// Name of the file the user imported
    pub original_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
