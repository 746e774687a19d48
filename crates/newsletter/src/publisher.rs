//! Publisher: coordinates the store, the brand registry and the renderer
//!
//! Saves check the document's brand against the registry before touching
//! storage; exports load, render and name the output in one call. With an
//! asset library attached, uploads land in it, exports check image files
//! against it and deletes clean it up.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use crate::backup::{self, BackupReport};
use crate::brands::BrandRegistry;
use crate::error::{ContentError, Result};
use crate::export::{ExportedDocument, export_filename};
use crate::assets::AssetLibrary;
use crate::models::{Asset, Brand, Document, DocumentId, SectionId};
use crate::render::{RenderMode, render_with_assets};
use crate::storage::{DocumentStore, StoreSnapshot, StoreStatus};

/// Entry point for the cross-component flows
pub struct Publisher {
    store: Arc<dyn DocumentStore>,
    brands: Arc<BrandRegistry>,
    assets: Option<AssetLibrary>,
}

impl Publisher {
    /// Create a new publisher
    pub fn new(store: Arc<dyn DocumentStore>, brands: Arc<BrandRegistry>) -> Self {
        Self {
            store,
            brands,
            assets: None,
        }
    }

    /// Attach the library uploads are copied into
    pub fn with_assets(mut self, library: AssetLibrary) -> Self {
        self.assets = Some(library);
        self
    }

    pub fn asset_library(&self) -> Option<&AssetLibrary> {
        self.assets.as_ref()
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn brands(&self) -> &BrandRegistry {
        &self.brands
    }

    /// The registered brand a document belongs to
    pub fn brand_for(&self, document: &Document) -> Result<&Brand> {
        self.brands.get(document.brand.as_str()).map_err(|_| {
            ContentError::field(
                "brand",
                format!("unknown brand '{}'", document.brand),
            )
            .in_document(document.id)
        })
    }

    /// Persist a new document under its canonical brand id
    pub fn save_new(&self, document: &mut Document) -> Result<DocumentId> {
        let brand_id = self.brand_for(document)?.id.clone();
        document.brand = brand_id;
        let id = self.store.create(document)?;
        info!(
            "[PUBLISH] Created {} {id} '{}' for {}",
            document.kind(),
            document.title,
            document.brand
        );
        Ok(id)
    }

    /// Persist changes to an existing document
    pub fn save(&self, document: &mut Document) -> Result<()> {
        let brand_id = self.brand_for(document)?.id.clone();
        document.brand = brand_id;
        self.store.update(document)
    }

    /// Delete a document, its sections and its uploaded files
    ///
    /// The store drops the asset records with the document; a file that
    /// can't be removed afterwards is logged and left behind.
    pub fn delete(&self, id: DocumentId) -> Result<()> {
        let assets = match &self.assets {
            Some(_) => self.store.assets(id)?,
            None => Vec::new(),
        };
        self.store.delete(id)?;
        info!("[PUBLISH] Deleted document {id}");

        if let Some(library) = &self.assets {
            match library.remove_files(&assets) {
                Ok(removed) if removed > 0 => {
                    info!("[PUBLISH] Removed {removed} asset files of document {id}")
                }
                Ok(_) => {}
                Err(e) => warn!("[PUBLISH] Failed to remove asset files of document {id}: {e}"),
            }
        }
        Ok(())
    }

    /// Copy an image into the asset library for a stored document
    pub fn import_asset(
        &self,
        id: DocumentId,
        section: Option<SectionId>,
        source: &Path,
    ) -> Result<Asset> {
        let library = self.assets.as_ref().ok_or_else(|| {
            ContentError::storage("no asset library configured")
        })?;
        let document = self.store.get(id)?;
        if let Some(section) = section {
            if document.section(section).is_none() {
                return Err(ContentError::not_found(format!("section {section}"))
                    .in_document(Some(id)));
            }
        }
        library.import(self.store.as_ref(), id, section, source)
    }

    pub fn assets(&self, id: DocumentId) -> Result<Vec<Asset>> {
        self.store.assets(id)
    }

    /// Render an in-memory document with its own brand
    pub fn export_document(&self, document: &Document, mode: RenderMode) -> Result<ExportedDocument> {
        let brand = self.brand_for(document)?;
        let html = render_with_assets(document, mode, brand, self.assets.as_ref())?;
        Ok(ExportedDocument {
            filename: export_filename(document, brand, mode),
            html,
        })
    }

    /// Load a stored document and render it
    pub fn export(&self, id: DocumentId, mode: RenderMode) -> Result<ExportedDocument> {
        let document = self.store.get(id)?;
        self.export_document(&document, mode)
    }

    /// Render a stored document and write it into `dir`
    pub fn export_to_dir(&self, id: DocumentId, mode: RenderMode, dir: &Path) -> Result<PathBuf> {
        let exported = self.export(id, mode)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(&exported.filename);
        fs::write(&path, exported.html.as_bytes())?;
        info!(
            "[PUBLISH] Exported document {id} ({mode}) to {}",
            path.display()
        );
        Ok(path)
    }

    /// Write a backup of the whole store into `dir`
    pub fn backup(&self, dir: &Path) -> Result<BackupReport> {
        backup::backup_to_dir(self.store.as_ref(), dir)
    }

    /// Replace the store's content with a backup artifact
    pub fn restore(&self, path: &Path) -> Result<StoreSnapshot> {
        backup::restore_from_file(self.store.as_ref(), path)
    }

    /// Check the store is reachable
    pub fn health(&self) -> Result<()> {
        self.store.ping().inspect_err(|e| error!("[PUBLISH] Health check failed: {e}"))
    }

    pub fn status(&self) -> Result<StoreStatus> {
        self.store.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionContent;
    use crate::storage::InMemoryDocumentStore;

    fn publisher() -> Publisher {
        Publisher::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(BrandRegistry::builtin()),
        )
    }

    #[test]
    fn test_save_new_canonicalizes_brand() {
        let publisher = publisher();
        let mut doc = Document::newsletter("Aardvark Tactical", "Q3", "September", 2025);
        let id = publisher.save_new(&mut doc).unwrap();
        assert_eq!(publisher.store().get(id).unwrap().brand.as_str(), "aardvark");
    }

    #[test]
    fn test_unknown_brand_rejected() {
        let publisher = publisher();
        let mut doc = Document::newsletter("acme", "Q3", "September", 2025);
        assert!(publisher.save_new(&mut doc).unwrap_err().is_validation());
        assert_eq!(publisher.status().unwrap().documents(), 0);
    }

    #[test]
    fn test_export_to_dir() {
        let publisher = publisher();
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::eblast("project7", "Summer Sale", Some("Save 20%".to_string()));
        doc.insert_section(SectionContent::call_to_action("Shop", "https://example.com"), None)
            .unwrap();
        let id = publisher.save_new(&mut doc).unwrap();

        let path = publisher.export_to_dir(id, RenderMode::Web, dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "project7_eblast_Summer_Sale_website.html"
        );
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Save 20%"));
    }

    #[test]
    fn test_export_missing_document() {
        let publisher = publisher();
        let err = publisher.export(DocumentId::new(7), RenderMode::Email).unwrap_err();
        assert!(err.is_not_found());
    }

    fn publisher_with_library(dir: &Path) -> Publisher {
        publisher().with_assets(AssetLibrary::new(dir.join("uploads")))
    }

    #[test]
    fn test_import_asset_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_with_library(dir.path());
        let source = dir.path().join("banner.png");
        fs::write(&source, b"png").unwrap();

        let mut doc = Document::newsletter("aardvark", "Q3", "September", 2025);
        let image = doc
            .insert_section(SectionContent::image("placeholder.png", "banner"), None)
            .unwrap();
        let id = publisher.save_new(&mut doc).unwrap();

        let asset = publisher.import_asset(id, Some(image), &source).unwrap();
        assert_eq!(asset.section_id, Some(image));
        assert_eq!(publisher.assets(id).unwrap(), vec![asset.clone()]);

        let html = publisher.export(id, RenderMode::Email).unwrap().html;
        assert!(html.contains("Image unavailable: banner"));

        doc.update_section(image, SectionContent::image(asset.file_name.clone(), "banner"))
            .unwrap();
        publisher.save(&mut doc).unwrap();
        let html = publisher.export(id, RenderMode::Email).unwrap().html;
        assert!(html.contains(&format!("<img src=\"{}\"", asset.file_name)));
    }

    #[test]
    fn test_import_asset_unknown_section() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_with_library(dir.path());
        let source = dir.path().join("banner.png");
        fs::write(&source, b"png").unwrap();
        let mut doc = Document::newsletter("aardvark", "Q3", "September", 2025);
        let id = publisher.save_new(&mut doc).unwrap();

        let err = publisher
            .import_asset(id, Some(SectionId::new(4)), &source)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(publisher.assets(id).unwrap().is_empty());
    }

    #[test]
    fn test_import_asset_needs_library() {
        let publisher = publisher();
        let mut doc = Document::newsletter("aardvark", "Q3", "September", 2025);
        let id = publisher.save_new(&mut doc).unwrap();
        let err = publisher
            .import_asset(id, None, Path::new("banner.png"))
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_delete_removes_asset_files() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_with_library(dir.path());
        let source = dir.path().join("banner.png");
        fs::write(&source, b"png").unwrap();
        let mut doc = Document::newsletter("aardvark", "Q3", "September", 2025);
        let id = publisher.save_new(&mut doc).unwrap();
        let asset = publisher.import_asset(id, None, &source).unwrap();

        publisher.delete(id).unwrap();
        let library = publisher.asset_library().unwrap();
        assert!(!library.contains(&asset.file_name));
        assert!(publisher.assets(id).unwrap().is_empty());
    }

    #[test]
    fn test_health() {
        publisher().health().unwrap();
    }
}
