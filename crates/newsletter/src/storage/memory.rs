//! In-memory storage implementation
//!
//! Used by tests and by callers that don't need persistence.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::traits::{
    DocumentStore, DocumentSummary, ListRange, StoreSnapshot, StoreStatus, ensure_storable,
    next_stamp,
};
use crate::error::{ContentError, Result};
use crate::models::{Asset, AssetId, BrandId, Document, DocumentId, DocumentKind};

#[derive(Default)]
struct State {
    documents: BTreeMap<DocumentId, Document>,
    assets: BTreeMap<AssetId, Asset>,
    /// Highest id ever handed out; ids are never reused
    last_id: i64,
    last_asset_id: i64,
}

impl State {
    /// Matching documents in listing order
    fn listing(&self, kind: DocumentKind, brand: Option<&BrandId>) -> Vec<&Document> {
        let mut matching: Vec<&Document> = self
            .documents
            .values()
            .filter(|d| d.kind() == kind)
            .filter(|d| brand.is_none_or(|b| &d.brand == b))
            .collect();
        matching.sort_by_key(|d| Reverse((d.modified_at, d.id)));
        matching
    }

    fn latest_modified(&self) -> Option<DateTime<Utc>> {
        self.documents.values().map(|d| d.modified_at).max()
    }
}

/// In-memory implementation of DocumentStore
///
/// A single RwLock guards the whole map, so every operation sees and
/// writes a consistent state.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| ContentError::storage("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| ContentError::storage("memory store lock poisoned"))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn create(&self, document: &mut Document) -> Result<DocumentId> {
        if let Some(id) = document.id {
            return Err(ContentError::validation(format!(
                "document {id} already exists; use update"
            )));
        }
        ensure_storable(document)?;

        let mut state = self.write()?;
        state.last_id += 1;
        let id = DocumentId::new(state.last_id);
        let now = next_stamp(state.latest_modified());

        document.id = Some(id);
        document.set_timestamps(now, now);
        state.documents.insert(id, document.clone());
        Ok(id)
    }

    fn get(&self, id: DocumentId) -> Result<Document> {
        self.read()?
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| ContentError::not_found(format!("document {id}")))
    }

    fn update(&self, document: &mut Document) -> Result<()> {
        let id = document
            .id
            .ok_or_else(|| ContentError::validation("document has not been created yet"))?;
        ensure_storable(document)?;

        let mut state = self.write()?;
        let now = next_stamp(state.latest_modified());
        let stored = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| ContentError::not_found(format!("document {id}")))?;

        document.set_timestamps(stored.created_at, now);
        *stored = document.clone();
        Ok(())
    }

    fn delete(&self, id: DocumentId) -> Result<()> {
        let mut state = self.write()?;
        state
            .documents
            .remove(&id)
            .ok_or_else(|| ContentError::not_found(format!("document {id}")))?;
        state.assets.retain(|_, asset| asset.document_id != id);
        Ok(())
    }

    fn list_page(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentSummary>> {
        let state = self.read()?;
        Ok(state
            .listing(kind, brand)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(DocumentSummary::from)
            .collect())
    }

    fn list_range(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        range: &ListRange,
        limit: usize,
    ) -> Result<Vec<DocumentSummary>> {
        let state = self.read()?;
        Ok(state
            .listing(kind, brand)
            .into_iter()
            .map(DocumentSummary::from)
            .filter(|s| range.contains(&s.key()))
            .take(limit)
            .collect())
    }

    fn add_asset(&self, asset: &mut Asset) -> Result<AssetId> {
        let mut state = self.write()?;
        if !state.documents.contains_key(&asset.document_id) {
            return Err(ContentError::not_found(format!("document {}", asset.document_id)));
        }
        state.last_asset_id += 1;
        let id = AssetId::new(state.last_asset_id);
        asset.id = Some(id);
        state.assets.insert(id, asset.clone());
        Ok(id)
    }

    fn assets(&self, document: DocumentId) -> Result<Vec<Asset>> {
        Ok(self
            .read()?
            .assets
            .values()
            .filter(|a| a.document_id == document)
            .cloned()
            .collect())
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.read()?;
        Ok(StoreSnapshot::new(
            state.documents.values().cloned().collect(),
            state.assets.values().cloned().collect(),
        ))
    }

    fn restore(&self, snapshot: &StoreSnapshot) -> Result<()> {
        snapshot.check()?;

        let documents: BTreeMap<DocumentId, Document> = snapshot
            .documents
            .iter()
            .filter_map(|d| d.id.map(|id| (id, d.clone())))
            .collect();
        let assets: BTreeMap<AssetId, Asset> = snapshot
            .assets
            .iter()
            .filter_map(|a| a.id.map(|id| (id, a.clone())))
            .collect();
        let highest = documents.keys().last().map(|id| id.get()).unwrap_or(0);
        let highest_asset = assets.keys().last().map(|id| id.get()).unwrap_or(0);

        let mut state = self.write()?;
        state.last_id = state.last_id.max(highest);
        state.last_asset_id = state.last_asset_id.max(highest_asset);
        state.documents = documents;
        state.assets = assets;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.read().map(|_| ())
    }

    fn status(&self) -> Result<StoreStatus> {
        let state = self.read()?;
        let count = |kind: DocumentKind| state.documents.values().filter(|d| d.kind() == kind).count();
        Ok(StoreStatus {
            newsletters: count(DocumentKind::Newsletter),
            eblasts: count(DocumentKind::Eblast),
            sections: state.documents.values().map(|d| d.sections().len()).sum(),
            assets: state.assets.len(),
            location: "memory".to_string(),
            size_bytes: None,
        })
    }
}
