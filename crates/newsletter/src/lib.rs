//! Newsletter crate - content model, storage and rendering for Pressroom
//!
//! This crate provides:
//! - Domain models (Document, Section, Brand)
//! - Brand registry
//! - Storage trait abstractions with SQLite and in-memory backends
//! - Query API for listing stored documents
//! - Render engine producing email-safe and web HTML
//! - Export naming, whole-store backup and restore
//! - An asset library for uploaded images
//! - A publisher facade tying them together

pub mod assets;
pub mod backup;
pub mod brands;
pub mod error;
pub mod export;
pub mod models;
pub mod publisher;
pub mod query;
pub mod render;
pub mod settings;
pub mod storage;

pub use assets::AssetLibrary;
pub use backup::{BackupReport, backup_to_dir, read_snapshot, restore_from_file, write_snapshot};
pub use brands::BrandRegistry;
pub use error::{ContentError, Result};
pub use export::{ExportedDocument, export_filename};
pub use models::{
    Asset, AssetId, Brand, BrandId, Document, DocumentDetails, DocumentId, DocumentKind, Section, SectionContent,
    SectionId, SectionKind, Violation,
};
pub use publisher::Publisher;
pub use query::{DocumentDetail, get_document_detail, list, list_documents};
pub use render::{RenderMode, render, render_with_assets};
pub use settings::Settings;
pub use storage::{
    DocumentStore, DocumentSummary, InMemoryDocumentStore, ListKey, ListRange, SqliteDocumentStore,
    StoreSnapshot, StoreStatus,
};
