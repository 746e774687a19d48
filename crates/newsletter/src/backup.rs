//! Whole-store backups as zstd-compressed JSON snapshots
//!
//! ```text
//! backups/
//!   pressroom_20250919_143005_120.json.zst
//!   pressroom_20251001_090000_004.json.zst
//! ```

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{ContentError, Result};
use crate::storage::{DocumentStore, StoreSnapshot};

/// Extension of backup artifacts
pub const BACKUP_EXTENSION: &str = "json.zst";

const COMPRESSION_LEVEL: i32 = 3; // Good balance of speed vs compression

/// What a backup wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReport {
    pub path: PathBuf,
    pub taken_at: DateTime<Utc>,
    pub documents: usize,
    pub sections: usize,
    pub size_bytes: u64,
}

/// Default artifact name for a snapshot taken at `at`
pub fn backup_file_name(at: &DateTime<Utc>) -> String {
    format!("pressroom_{}.{BACKUP_EXTENSION}", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Snapshot the store and write it into `dir` under a timestamped name
pub fn backup_to_dir(store: &dyn DocumentStore, dir: &Path) -> Result<BackupReport> {
    let snapshot = store.snapshot()?;
    let path = dir.join(backup_file_name(&snapshot.taken_at));
    write_snapshot(&snapshot, &path)
}

/// Compress a snapshot to `path`
///
/// The artifact is written to a temp file beside `path`, synced, and only
/// then linked into place, so a crash never leaves a truncated backup
/// behind. Linking fails if `path` already exists, which keeps two writers
/// racing for the same name from clobbering each other.
pub fn write_snapshot(snapshot: &StoreSnapshot, path: &Path) -> Result<BackupReport> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let json = serde_json::to_vec(snapshot)?;
    let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| ContentError::storage(format!("failed to compress backup: {e}")))?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(&compressed)?;
    temp.as_file().sync_all()?;
    temp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            ContentError::storage(format!("backup {} already exists", path.display()))
        } else {
            ContentError::storage(format!(
                "failed to write backup {}: {}",
                path.display(),
                e.error
            ))
        }
    })?;

    let report = BackupReport {
        path: path.to_path_buf(),
        taken_at: snapshot.taken_at,
        documents: snapshot.documents.len(),
        sections: snapshot.section_count(),
        size_bytes: compressed.len() as u64,
    };
    info!(
        "[BACKUP] Wrote {} documents, {} sections to {} ({} bytes)",
        report.documents,
        report.sections,
        path.display(),
        report.size_bytes
    );
    Ok(report)
}

/// Read and check a backup artifact
pub fn read_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let compressed = fs::read(path).map_err(|e| {
        ContentError::storage(format!("failed to read backup {}: {e}", path.display()))
    })?;

    let mut decoder = zstd::Decoder::new(compressed.as_slice())?;
    let mut json = Vec::new();
    decoder.read_to_end(&mut json).map_err(|e| {
        ContentError::storage(format!("failed to decompress backup {}: {e}", path.display()))
    })?;

    let snapshot: StoreSnapshot = serde_json::from_slice(&json)?;
    snapshot.check()?;
    Ok(snapshot)
}

/// Replace the store's content with the backup at `path`
pub fn restore_from_file(store: &dyn DocumentStore, path: &Path) -> Result<StoreSnapshot> {
    let snapshot = read_snapshot(path)?;
    store.restore(&snapshot)?;
    info!(
        "[BACKUP] Restored snapshot taken {} from {}",
        snapshot.taken_at.to_rfc3339(),
        path.display()
    );
    Ok(snapshot)
}

/// Backup artifacts in `dir`, newest first
pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let suffix = format!(".{BACKUP_EXTENSION}");
    let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix))
        })
        .collect();
    // Timestamped names sort chronologically
    backups.sort();
    backups.reverse();
    Ok(backups)
}
