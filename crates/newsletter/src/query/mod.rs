//! Query API for listing and inspecting stored documents

mod documents;

pub use documents::{
    DEFAULT_PAGE_SIZE, DocumentDetail, DocumentPages, get_document_detail, list, list_documents,
};
