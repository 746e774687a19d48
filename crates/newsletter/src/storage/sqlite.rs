//! SQLite-backed document storage

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{
    Connection, OpenFlags, OptionalExtension, Statement, Transaction, TransactionBehavior,
    params,
};
use rusqlite_migration::{M, Migrations};

use super::traits::{
    DocumentStore, DocumentSummary, ListRange, StoreSnapshot, StoreStatus, ensure_storable,
    format_timestamp, next_stamp, parse_timestamp,
};
use crate::error::{ContentError, Result};
use crate::models::{
    Asset, AssetId, BrandId, Document, DocumentDetails, DocumentId, DocumentKind, Section,
    SectionContent, SectionId,
};

/// Database migrations
///
/// Applied in order; the user_version pragma tracks which have run.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL CHECK (kind IN ('newsletter', 'eblast')),
                brand_id TEXT NOT NULL,
                title TEXT NOT NULL,
                issue_month TEXT,
                issue_year INTEGER,
                subject_line TEXT,
                next_section_id INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );

            CREATE INDEX idx_documents_kind_modified
                ON documents(kind, modified_at DESC);

            -- Section content is the JSON encoding of SectionContent
            CREATE TABLE sections (
                document_id INTEGER NOT NULL,
                section_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                background TEXT,
                content TEXT NOT NULL,
                PRIMARY KEY (document_id, section_id),
                UNIQUE (document_id, position),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );
            "#,
        ),
        // Migration 2: Brand filter for listings
        M::up(
            r#"
            CREATE INDEX idx_documents_brand_modified
                ON documents(kind, brand_id, modified_at DESC);
            "#,
        ),
        // Migration 3: Imported image assets
        M::up(
            r#"
            CREATE TABLE assets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                section_id INTEGER,
                file_name TEXT NOT NULL UNIQUE,
                original_name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_assets_document ON assets(document_id);
            "#,
        ),
    ])
}

/// Raw `documents` row
type DocumentRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<i32>,
    Option<String>,
    i64,
    String,
    String,
);

const DOCUMENT_COLUMNS: &str = "id, kind, brand_id, title, issue_month, issue_year, \
     subject_line, next_section_id, created_at, modified_at";

const ASSET_COLUMNS: &str =
    "id, document_id, section_id, file_name, original_name, size_bytes, created_at";

/// Summary columns shared by the listing queries
const SUMMARY_SELECT: &str = "SELECT d.id, d.title, d.brand_id, d.modified_at,
            (SELECT COUNT(*) FROM sections s WHERE s.document_id = d.id)
     FROM documents d";

/// SQLite document storage
///
/// Writes go through one connection guarded by a mutex, each in an
/// IMMEDIATE transaction so concurrent processes on the same file serialize
/// cleanly. File-backed stores read through a second, read-only connection:
/// under WAL a long read (a snapshot) holds its own view without blocking
/// writers. In-memory stores have a single connection for both.
pub struct SqliteDocumentStore {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    location: Option<PathBuf>,
}

impl SqliteDocumentStore {
    /// Open (or create) the database at `db_path` and bring its schema up to date
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| {
            ContentError::storage(format!("failed to open database at {}: {e}", db_path.display()))
        })?;

        // busy_timeout makes a second writer wait instead of failing.
        // foreign_keys is required for ON DELETE CASCADE.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        let writer = Self::migrate(conn)?;

        // Opened after migrating so it never sees a half-built schema
        let reader = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ContentError::storage(format!(
                "failed to open read connection to {}: {e}",
                db_path.display()
            ))
        })?;
        reader.execute_batch("PRAGMA busy_timeout = 5000;")?;

        info!("[STORE] Opened {}", db_path.display());
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
            location: Some(db_path.to_path_buf()),
        })
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            writer: Mutex::new(Self::migrate(conn)?),
            reader: None,
            location: None,
        })
    }

    fn migrate(mut conn: Connection) -> Result<Connection> {
        migrations().to_latest(&mut conn)?;
        Ok(conn)
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Copy the live database into a new file with `VACUUM INTO`
    ///
    /// The copy is transactionally consistent even while other writers are
    /// active. Fails if `dest` already exists.
    pub fn backup_database(&self, dest: &Path) -> Result<u64> {
        if dest.exists() {
            return Err(ContentError::storage(format!(
                "backup target {} already exists",
                dest.display()
            )));
        }
        let conn = self.lock()?;
        conn.execute("VACUUM INTO ?1", [dest.to_string_lossy()])?;
        let size = std::fs::metadata(dest)?.len();
        info!("[STORE] Database copied to {} ({size} bytes)", dest.display());
        Ok(size)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| ContentError::storage("database connection lock poisoned"))
    }

    /// Connection for reads; the writer when there is no separate reader
    fn read_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        match &self.reader {
            Some(reader) => reader
                .lock()
                .map_err(|_| ContentError::storage("database read connection lock poisoned")),
            None => self.lock(),
        }
    }

    fn query_summaries(
        stmt: &mut Statement<'_>,
        params: impl rusqlite::Params,
        kind: DocumentKind,
    ) -> Result<Vec<DocumentSummary>> {
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, title, brand, modified, sections)| {
                Ok(DocumentSummary {
                    id: DocumentId::new(id),
                    kind,
                    title,
                    brand: BrandId::new(brand),
                    modified_at: parse_timestamp(&modified)?,
                    section_count: sections as usize,
                })
            })
            .collect()
    }

    fn load_assets(conn: &Connection, document: Option<DocumentId>) -> Result<Vec<Asset>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets
             WHERE ?1 IS NULL OR document_id = ?1
             ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([document.map(|d| d.get())], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, document_id, section_id, file_name, original_name, size, created)| {
                Ok(Asset {
                    id: Some(AssetId::new(id)),
                    document_id: DocumentId::new(document_id),
                    section_id: section_id.map(|s| SectionId::new(s as u64)),
                    file_name,
                    original_name,
                    size_bytes: size as u64,
                    created_at: parse_timestamp(&created)?,
                })
            })
            .collect()
    }

    /// Stamp for a write, later than anything already stored
    fn next_modified(tx: &Transaction<'_>) -> Result<DateTime<Utc>> {
        let latest: Option<String> =
            tx.query_row("SELECT MAX(modified_at) FROM documents", [], |row| row.get(0))?;
        Ok(next_stamp(latest.as_deref().map(parse_timestamp).transpose()?))
    }

    fn insert_asset(tx: &Transaction<'_>, asset: &Asset) -> Result<AssetId> {
        tx.execute(
            &format!("INSERT INTO assets ({ASSET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            params![
                asset.id.map(|id| id.get()),
                asset.document_id.get(),
                asset.section_id.map(|s| s.get() as i64),
                asset.file_name,
                asset.original_name,
                asset.size_bytes as i64,
                format_timestamp(&asset.created_at),
            ],
        )?;
        Ok(AssetId::new(tx.last_insert_rowid()))
    }

    fn load_document(conn: &Connection, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<DocumentRow> = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"),
                [id.get()],
                read_document_row,
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(conn, row)?)),
            None => Ok(None),
        }
    }

    fn hydrate(conn: &Connection, row: DocumentRow) -> Result<Document> {
        let (id, kind, brand, title, month, year, subject_line, next_section_id, created, modified) =
            row;
        let id = DocumentId::new(id);

        let details = match kind.parse::<DocumentKind>() {
            Ok(DocumentKind::Newsletter) => DocumentDetails::Newsletter {
                month: month.unwrap_or_default(),
                year: year.unwrap_or_default(),
            },
            Ok(DocumentKind::Eblast) => DocumentDetails::Eblast { subject_line },
            Err(_) => {
                return Err(ContentError::storage(format!(
                    "document {id} has unknown kind '{kind}'"
                )));
            }
        };

        let sections = Self::load_sections(conn, id)?;
        Ok(Document::from_parts(
            id,
            BrandId::new(brand),
            title,
            details,
            parse_timestamp(&created)?,
            parse_timestamp(&modified)?,
            sections,
            next_section_id as u64,
        ))
    }

    fn load_sections(conn: &Connection, id: DocumentId) -> Result<Vec<Section>> {
        let mut stmt = conn.prepare(
            "SELECT section_id, position, enabled, background, content FROM sections
             WHERE document_id = ?
             ORDER BY position, section_id",
        )?;

        let rows = stmt
            .query_map([id.get()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(section_id, position, enabled, background, content)| {
                let content: SectionContent = serde_json::from_str(&content).map_err(|e| {
                    ContentError::storage(format!(
                        "corrupt content for section {section_id} of document {id}: {e}"
                    ))
                })?;
                let mut section =
                    Section::new(SectionId::new(section_id as u64), position as u32, content);
                section.enabled = enabled;
                section.background = background;
                Ok(section)
            })
            .collect()
    }

    fn save_sections(tx: &Transaction<'_>, id: DocumentId, sections: &[Section]) -> Result<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO sections (document_id, section_id, position, kind, enabled, background, content)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;

        for section in sections {
            stmt.execute(params![
                id.get(),
                section.id.get() as i64,
                section.position as i64,
                section.kind().as_str(),
                section.enabled,
                section.background,
                serde_json::to_string(&section.content)?,
            ])?;
        }
        Ok(())
    }

    /// Insert a documents row, with an explicit id when restoring
    fn insert_document(tx: &Transaction<'_>, document: &Document, id: Option<DocumentId>) -> Result<DocumentId> {
        let (month, year, subject_line) = detail_columns(&document.details);
        tx.execute(
            "INSERT INTO documents (id, kind, brand_id, title, issue_month, issue_year,
                                    subject_line, next_section_id, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.map(|id| id.get()),
                document.kind().as_str(),
                document.brand.as_str(),
                document.title,
                month,
                year,
                subject_line,
                document.next_section_id() as i64,
                format_timestamp(&document.created_at),
                format_timestamp(&document.modified_at),
            ],
        )?;
        Ok(DocumentId::new(tx.last_insert_rowid()))
    }
}

fn read_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn detail_columns(details: &DocumentDetails) -> (Option<&str>, Option<i32>, Option<&str>) {
    match details {
        DocumentDetails::Newsletter { month, year } => (Some(month.as_str()), Some(*year), None),
        DocumentDetails::Eblast { subject_line } => (None, None, subject_line.as_deref()),
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn create(&self, document: &mut Document) -> Result<DocumentId> {
        if let Some(id) = document.id {
            return Err(ContentError::validation(format!(
                "document {id} already exists; use update"
            )));
        }
        ensure_storable(document)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Self::next_modified(&tx)?;
        let mut stored = document.clone();
        stored.set_timestamps(now, now);
        let id = Self::insert_document(&tx, &stored, None)?;
        Self::save_sections(&tx, id, stored.sections())?;
        tx.commit()?;

        document.id = Some(id);
        document.set_timestamps(now, now);
        debug!(
            "[STORE] Created {} {id} with {} sections",
            document.kind(),
            document.sections().len()
        );
        Ok(id)
    }

    fn get(&self, id: DocumentId) -> Result<Document> {
        let mut conn = self.read_conn()?;
        // The document row and its sections come from one read view
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let document = Self::load_document(&tx, id)?;
        tx.commit()?;
        document.ok_or_else(|| ContentError::not_found(format!("document {id}")))
    }

    fn update(&self, document: &mut Document) -> Result<()> {
        let id = document
            .id
            .ok_or_else(|| ContentError::validation("document has not been created yet"))?;
        ensure_storable(document)?;

        let (month, year, subject_line) = detail_columns(&document.details);

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Self::next_modified(&tx)?;
        let changed = tx.execute(
            "UPDATE documents
             SET kind = ?, brand_id = ?, title = ?, issue_month = ?, issue_year = ?,
                 subject_line = ?, next_section_id = ?, modified_at = ?
             WHERE id = ?",
            params![
                document.kind().as_str(),
                document.brand.as_str(),
                document.title,
                month,
                year,
                subject_line,
                document.next_section_id() as i64,
                format_timestamp(&now),
                id.get(),
            ],
        )?;
        if changed == 0 {
            return Err(ContentError::not_found(format!("document {id}")));
        }

        let created: String =
            tx.query_row("SELECT created_at FROM documents WHERE id = ?", [id.get()], |row| {
                row.get(0)
            })?;
        let created_at = parse_timestamp(&created)?;

        tx.execute("DELETE FROM sections WHERE document_id = ?", [id.get()])?;
        Self::save_sections(&tx, id, document.sections())?;
        tx.commit()?;

        document.set_timestamps(created_at, now);
        debug!("[STORE] Updated {} {id}", document.kind());
        Ok(())
    }

    fn delete(&self, id: DocumentId) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Sections and asset records are deleted via CASCADE
        let deleted = tx.execute("DELETE FROM documents WHERE id = ?", [id.get()])?;
        if deleted == 0 {
            return Err(ContentError::not_found(format!("document {id}")));
        }
        tx.commit()?;
        debug!("[STORE] Deleted document {id}");
        Ok(())
    }

    fn list_page(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentSummary>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SUMMARY_SELECT}
             WHERE d.kind = ?1 AND (?2 IS NULL OR d.brand_id = ?2)
             ORDER BY d.modified_at DESC, d.id DESC
             LIMIT ?3 OFFSET ?4"
        ))?;
        Self::query_summaries(
            &mut stmt,
            params![
                kind.as_str(),
                brand.map(|b| b.as_str()),
                limit as i64,
                offset as i64
            ],
            kind,
        )
    }

    fn list_range(
        &self,
        kind: DocumentKind,
        brand: Option<&BrandId>,
        range: &ListRange,
        limit: usize,
    ) -> Result<Vec<DocumentSummary>> {
        let conn = self.read_conn()?;
        // Stored timestamps are fixed-width, so row-value comparison on
        // (modified_at, id) matches the listing order
        let mut stmt = conn.prepare(&format!(
            "{SUMMARY_SELECT}
             WHERE d.kind = ?1 AND (?2 IS NULL OR d.brand_id = ?2)
               AND (?3 IS NULL OR (d.modified_at, d.id) < (?3, ?4))
               AND (?5 IS NULL OR (d.modified_at, d.id) > (?5, ?6))
             ORDER BY d.modified_at DESC, d.id DESC
             LIMIT ?7"
        ))?;
        Self::query_summaries(
            &mut stmt,
            params![
                kind.as_str(),
                brand.map(|b| b.as_str()),
                range.before.map(|k| format_timestamp(&k.modified_at)),
                range.before.map(|k| k.id.get()),
                range.after.map(|k| format_timestamp(&k.modified_at)),
                range.after.map(|k| k.id.get()),
                limit as i64,
            ],
            kind,
        )
    }

    fn add_asset(&self, asset: &mut Asset) -> Result<AssetId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM documents WHERE id = ?",
                [asset.document_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(ContentError::not_found(format!("document {}", asset.document_id)));
        }
        let id = Self::insert_asset(&tx, &Asset { id: None, ..asset.clone() })?;
        tx.commit()?;

        asset.id = Some(id);
        debug!(
            "[STORE] Recorded asset {id} '{}' for document {}",
            asset.file_name, asset.document_id
        );
        Ok(id)
    }

    fn assets(&self, document: DocumentId) -> Result<Vec<Asset>> {
        let conn = self.read_conn()?;
        Self::load_assets(&conn, Some(document))
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let mut conn = self.read_conn()?;
        // A read transaction pins one consistent view while writers carry on
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let rows: Vec<DocumentRow> = {
            let mut stmt =
                tx.prepare(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"))?;
            stmt.query_map([], read_document_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let documents = rows
            .into_iter()
            .map(|row| Self::hydrate(&tx, row))
            .collect::<Result<Vec<_>>>()?;
        let assets = Self::load_assets(&tx, None)?;
        tx.commit()?;

        Ok(StoreSnapshot::new(documents, assets))
    }

    fn restore(&self, snapshot: &StoreSnapshot) -> Result<()> {
        snapshot.check()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM assets", [])?;
        tx.execute("DELETE FROM sections", [])?;
        tx.execute("DELETE FROM documents", [])?;
        for document in &snapshot.documents {
            let id = Self::insert_document(&tx, document, document.id)?;
            Self::save_sections(&tx, id, document.sections())?;
        }
        for asset in &snapshot.assets {
            Self::insert_asset(&tx, asset)?;
        }
        tx.commit()?;

        info!(
            "[STORE] Restored {} documents, {} sections",
            snapshot.documents.len(),
            snapshot.section_count()
        );
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn status(&self) -> Result<StoreStatus> {
        let conn = self.read_conn()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let newsletters = count("SELECT COUNT(*) FROM documents WHERE kind = 'newsletter'")?;
        let eblasts = count("SELECT COUNT(*) FROM documents WHERE kind = 'eblast'")?;
        let sections = count("SELECT COUNT(*) FROM sections")?;
        let assets = count("SELECT COUNT(*) FROM assets")?;

        let (location, size_bytes) = match &self.location {
            Some(path) => (
                path.display().to_string(),
                std::fs::metadata(path).ok().map(|m| m.len()),
            ),
            None => ("memory".to_string(), None),
        };

        Ok(StoreStatus {
            newsletters,
            eblasts,
            sections,
            assets,
            location,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionContent;
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteDocumentStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        // .test.sqlite keeps test databases distinguishable
        let db_path = dir.path().join("pressroom.test.sqlite");
        let store = SqliteDocumentStore::open(&db_path).unwrap();
        (store, dir)
    }

    fn make_newsletter(title: &str) -> Document {
        let mut doc = Document::newsletter("aardvark", title, "September", 2025);
        doc.insert_section(SectionContent::heading(title), None).unwrap();
        doc.insert_section(SectionContent::body_text("Hello operators"), None)
            .unwrap();
        doc
    }

    #[test]
    fn test_document_crud() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Q3 Update");

        let id = store.create(&mut doc).unwrap();
        assert_eq!(doc.id, Some(id));
        assert_eq!(store.get(id).unwrap(), doc);

        let heading = doc.section_ids()[0];
        doc.update_section(heading, SectionContent::heading("Q3 Recap"))
            .unwrap();
        doc.set_section_enabled(heading, false).unwrap();
        store.update(&mut doc).unwrap();
        assert_eq!(store.get(id).unwrap(), doc);

        store.delete(id).unwrap();
        assert!(store.get(id).unwrap_err().is_not_found());
        assert!(store.delete(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_twice_rejected() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Once");
        store.create(&mut doc).unwrap();
        assert!(store.create(&mut doc).unwrap_err().is_validation());
    }

    #[test]
    fn test_update_missing_document() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Ghost");
        assert!(store.update(&mut doc).unwrap_err().is_validation());

        doc.id = Some(DocumentId::new(404));
        assert!(store.update(&mut doc).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_cascades_sections() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Cascade");
        let id = store.create(&mut doc).unwrap();
        store.delete(id).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.sections, 0);
        assert_eq!(status.documents(), 0);
    }

    #[test]
    fn test_list_page_orders_and_filters() {
        let (store, _dir) = create_test_store();
        let mut first = make_newsletter("First");
        let mut second = make_newsletter("Second");
        let mut other = Document::newsletter("project7", "Field Notes", "May", 2025);
        let mut eblast = Document::eblast("aardvark", "Sale", None);
        store.create(&mut first).unwrap();
        store.create(&mut second).unwrap();
        store.create(&mut other).unwrap();
        store.create(&mut eblast).unwrap();

        // Touch the oldest so it moves to the front
        store.update(&mut first).unwrap();

        let page = store
            .list_page(DocumentKind::Newsletter, None, 10, 0)
            .unwrap();
        let titles: Vec<_> = page.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Field Notes", "Second"]);
        assert_eq!(page[0].section_count, 2);

        let aardvark = BrandId::new("aardvark");
        let page = store
            .list_page(DocumentKind::Newsletter, Some(&aardvark), 1, 1)
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Second");

        let eblasts = store.list_page(DocumentKind::Eblast, None, 10, 0).unwrap();
        assert_eq!(eblasts.len(), 1);
        assert_eq!(eblasts[0].kind, DocumentKind::Eblast);
    }

    #[test]
    fn test_snapshot_restore() {
        let (store, _dir) = create_test_store();
        let mut a = make_newsletter("A");
        let mut b = Document::eblast("project7", "B", Some("Subject".to_string()));
        b.insert_section(SectionContent::call_to_action("Shop", "https://example.com"), None)
            .unwrap();
        store.create(&mut a).unwrap();
        store.create(&mut b).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.documents, vec![a.clone(), b.clone()]);

        store.delete(a.id.unwrap()).unwrap();
        let mut c = make_newsletter("C");
        store.create(&mut c).unwrap();

        store.restore(&snapshot).unwrap();
        assert_eq!(store.snapshot().unwrap().documents, snapshot.documents);
        assert!(store.get(c.id.unwrap()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_rejects_invalid_document() {
        let (store, _dir) = create_test_store();
        let mut doc = Document::newsletter("", "No brand", "May", 2025);
        assert!(store.create(&mut doc).unwrap_err().is_validation());
        assert_eq!(store.status().unwrap().documents(), 0);
    }

    #[test]
    fn test_backup_database() {
        let (store, dir) = create_test_store();
        let mut doc = make_newsletter("Copied");
        store.create(&mut doc).unwrap();

        let copy = dir.path().join("copy.sqlite");
        assert!(store.backup_database(&copy).unwrap() > 0);
        assert!(store.backup_database(&copy).unwrap_err().is_storage());

        let reopened = SqliteDocumentStore::open(&copy).unwrap();
        assert_eq!(reopened.get(doc.id.unwrap()).unwrap(), doc);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pressroom.test.sqlite");
        let mut doc = make_newsletter("Persisted");
        {
            let store = SqliteDocumentStore::open(&path).unwrap();
            store.create(&mut doc).unwrap();
        }
        let store = SqliteDocumentStore::open(&path).unwrap();
        assert_eq!(store.get(doc.id.unwrap()).unwrap(), doc);
        store.ping().unwrap();
    }

    #[test]
    fn test_update_completes_during_snapshot_read() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Before");
        let id = store.create(&mut doc).unwrap();

        // Hold the read connection inside a read transaction, as a running
        // snapshot does
        let mut reader = store.read_conn().unwrap();
        let tx = reader
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .unwrap();
        let seen = SqliteDocumentStore::load_document(&tx, id).unwrap().unwrap();
        assert_eq!(seen.title, "Before");

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::scope(|scope| {
            let store = &store;
            let mut edited = doc.clone();
            scope.spawn(move || {
                edited.title = "After".to_string();
                done_tx.send(store.update(&mut edited)).unwrap();
            });

            let finished = done_rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("update blocked by an open read transaction");
            finished.unwrap();

            // The open read view still sees the old state
            let seen = SqliteDocumentStore::load_document(&tx, id).unwrap().unwrap();
            assert_eq!(seen.title, "Before");
        });
        drop(tx);
        drop(reader);

        assert_eq!(store.get(id).unwrap().title, "After");
    }

    #[test]
    fn test_list_range() {
        let (store, _dir) = create_test_store();
        for title in ["A", "B", "C"] {
            store.create(&mut make_newsletter(title)).unwrap();
        }
        let all = store
            .list_range(DocumentKind::Newsletter, None, &ListRange::default(), 10)
            .unwrap();
        let titles: Vec<_> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);

        let middle = ListRange {
            before: Some(all[0].key()),
            after: Some(all[2].key()),
        };
        let page = store
            .list_range(DocumentKind::Newsletter, None, &middle, 10)
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "B");
    }

    fn make_asset(document_id: DocumentId, name: &str) -> Asset {
        Asset {
            id: None,
            document_id,
            section_id: Some(SectionId::new(1)),
            file_name: name.to_string(),
            original_name: "banner.png".to_string(),
            size_bytes: 42,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_assets_cascade_and_restore() {
        let (store, _dir) = create_test_store();
        let mut doc = make_newsletter("Pictures");
        let id = store.create(&mut doc).unwrap();

        let mut asset = make_asset(id, "1-0001.png");
        store.add_asset(&mut asset).unwrap();
        assert_eq!(store.assets(id).unwrap(), vec![asset.clone()]);

        let mut duplicate = make_asset(id, "1-0001.png");
        assert!(store.add_asset(&mut duplicate).unwrap_err().is_storage());
        let mut orphan = make_asset(DocumentId::new(404), "404-0001.png");
        assert!(store.add_asset(&mut orphan).unwrap_err().is_not_found());

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.assets, vec![asset.clone()]);

        store.delete(id).unwrap();
        assert!(store.assets(id).unwrap().is_empty());
        assert_eq!(store.status().unwrap().assets, 0);

        store.restore(&snapshot).unwrap();
        assert_eq!(store.assets(id).unwrap(), vec![asset]);
    }

    #[test]
    fn test_in_memory_status() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let status = store.status().unwrap();
        assert_eq!(status.location, "memory");
        assert_eq!(status.size_bytes, None);
    }
}
