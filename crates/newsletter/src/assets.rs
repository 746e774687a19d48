//! Asset library: uploaded images copied into one directory
//!
//! ```text
//! uploads/
//!   12-20251019143005120.png
//!   12-20251019143005120-1.png
//! ```
//!
//! Every file belongs to one document and is recorded in the store; the
//! stored name is what image sections reference.

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::error::{ContentError, Result};
use crate::models::{Asset, DocumentId, SectionId};
use crate::storage::DocumentStore;

const MAX_NAME_ATTEMPTS: usize = 100;

/// Directory holding imported assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLibrary {
    dir: PathBuf,
}

impl AssetLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a reference lives in the library
    ///
    /// Only plain relative names qualify; anything that could climb out of
    /// the directory is `None`.
    pub fn path_of(&self, reference: &str) -> Option<PathBuf> {
        let relative = Path::new(reference);
        let plain = !reference.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        plain.then(|| self.dir.join(relative))
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.path_of(reference).is_some_and(|path| path.is_file())
    }

    /// Copy `source` into the library and record it against `document`
    ///
    /// The copy gets a fresh name that never replaces an existing file.
    /// If the store refuses the record, the copy is removed again.
    pub fn import(
        &self,
        store: &dyn DocumentStore,
        document: DocumentId,
        section: Option<SectionId>,
        source: &Path,
    ) -> Result<Asset> {
        let original_name = source
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| {
                ContentError::field(
                    "file",
                    format!("{} has no usable file name", source.display()),
                )
            })?
            .to_string();
        let mut input = File::open(source).map_err(|e| {
            ContentError::storage(format!("failed to open {}: {e}", source.display()))
        })?;

        fs::create_dir_all(&self.dir)?;
        let created_at = Utc::now();
        let extension = source
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let (file_name, mut output) = self.create_unique(document, &created_at, &extension)?;

        let copied = io::copy(&mut input, &mut output)
            .and_then(|size| output.sync_all().map(|()| size));
        let size_bytes = match copied {
            Ok(size) => size,
            Err(e) => {
                self.discard(&file_name);
                return Err(e.into());
            }
        };

        let mut asset = Asset {
            id: None,
            document_id: document,
            section_id: section,
            file_name,
            original_name,
            size_bytes,
            created_at,
        };
        if let Err(e) = store.add_asset(&mut asset) {
            self.discard(&asset.file_name);
            return Err(e);
        }

        info!(
            "[ASSETS] Imported {} as {} for document {document} ({size_bytes} bytes)",
            asset.original_name, asset.file_name
        );
        Ok(asset)
    }

    /// Delete the files behind `assets`, returning how many were removed
    ///
    /// Files already gone are skipped.
    pub fn remove_files(&self, assets: &[Asset]) -> Result<usize> {
        let mut removed = 0;
        for asset in assets {
            let Some(path) = self.path_of(&asset.file_name) else {
                warn!("[ASSETS] Skipping unusable file name '{}'", asset.file_name);
                continue;
            };
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn create_unique(
        &self,
        document: DocumentId,
        at: &DateTime<Utc>,
        extension: &str,
    ) -> Result<(String, File)> {
        let stamp = at.format("%Y%m%d%H%M%S%3f");
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{document}-{stamp}{extension}"),
                n => format!("{document}-{stamp}-{n}{extension}"),
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&name))
            {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ContentError::storage(format!(
            "no free asset name for document {document} in {}",
            self.dir.display()
        )))
    }

    fn discard(&self, file_name: &str) {
        let path = self.dir.join(file_name);
        if let Err(e) = fs::remove_file(&path) {
            warn!("[ASSETS] Failed to remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::storage::InMemoryDocumentStore;
    use tempfile::tempdir;

    fn store_with_document() -> (InMemoryDocumentStore, DocumentId) {
        let store = InMemoryDocumentStore::new();
        let mut doc = Document::newsletter("aardvark", "Assets", "May", 2025);
        let id = store.create(&mut doc).unwrap();
        (store, id)
    }

    #[test]
    fn test_import_copies_and_records() {
        let (store, id) = store_with_document();
        let dir = tempdir().unwrap();
        let source = dir.path().join("Banner.PNG");
        fs::write(&source, b"not really a png").unwrap();
        let library = AssetLibrary::new(dir.path().join("uploads"));

        let first = library.import(&store, id, None, &source).unwrap();
        let second = library.import(&store, id, None, &source).unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert!(first.file_name.starts_with(&format!("{id}-")));
        assert!(first.file_name.ends_with(".png"));
        assert_eq!(first.original_name, "Banner.PNG");
        assert_eq!(first.size_bytes, 16);
        assert!(library.contains(&first.file_name));
        assert!(library.contains(&second.file_name));
        assert_eq!(store.assets(id).unwrap(), vec![first, second]);
    }

    #[test]
    fn test_import_for_missing_document_leaves_no_file() {
        let store = InMemoryDocumentStore::new();
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        fs::write(&source, b"jpg").unwrap();
        let library = AssetLibrary::new(dir.path().join("uploads"));

        let err = library
            .import(&store, DocumentId::new(9), None, &source)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fs::read_dir(library.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_import_missing_source() {
        let (store, id) = store_with_document();
        let dir = tempdir().unwrap();
        let library = AssetLibrary::new(dir.path());
        let err = library
            .import(&store, id, None, &dir.path().join("nope.png"))
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_path_of_rejects_escapes() {
        let library = AssetLibrary::new("/srv/uploads");
        assert_eq!(
            library.path_of("1-a.png"),
            Some(PathBuf::from("/srv/uploads/1-a.png"))
        );
        assert_eq!(library.path_of(""), None);
        assert_eq!(library.path_of("../a.png"), None);
        assert_eq!(library.path_of("/etc/passwd"), None);
    }

    #[test]
    fn test_remove_files_skips_missing() {
        let (store, id) = store_with_document();
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, b"png").unwrap();
        let library = AssetLibrary::new(dir.path().join("uploads"));
        let kept = library.import(&store, id, None, &source).unwrap();
        let gone = library.import(&store, id, None, &source).unwrap();
        fs::remove_file(library.dir().join(&gone.file_name)).unwrap();

        assert_eq!(library.remove_files(&[kept.clone(), gone]).unwrap(), 1);
        assert!(!library.contains(&kept.file_name));
    }
}
