//! Storage traits and implementations
//!
//! The `DocumentStore` trait lets the publisher and the query helpers run
//! against SQLite in production and an in-memory map in tests.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use traits::{
    DocumentStore, DocumentSummary, ListKey, ListRange, SNAPSHOT_FORMAT_VERSION, StoreSnapshot,
    StoreStatus,
};
