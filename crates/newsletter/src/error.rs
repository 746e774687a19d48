//! Error taxonomy shared by every component of the crate

use crate::models::{DocumentId, SectionId};

/// Errors surfaced by the document model, store, renderer and brand registry
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Malformed or inconsistent input; the caller fixes the input and retries
    #[error("Validation error{}: {message}", location(.document, .section, .field))]
    Validation {
        document: Option<DocumentId>,
        section: Option<SectionId>,
        field: Option<String>,
        message: String,
    },

    /// Reference to a document, section or brand that doesn't exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// I/O or persistence failure, never retried internally
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The document can't be rendered without producing misleading output
    #[error("Render error{}: {message}", location(.document, .section, .field))]
    Render {
        document: Option<DocumentId>,
        section: Option<SectionId>,
        field: Option<String>,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ContentError>;

fn location(
    document: &Option<DocumentId>,
    section: &Option<SectionId>,
    field: &Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(document) = document {
        parts.push(format!("document {document}"));
    }
    if let Some(section) = section {
        parts.push(format!("section {section}"));
    }
    if let Some(field) = field {
        parts.push(format!("field '{field}'"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl ContentError {
    pub fn validation(message: impl Into<String>) -> Self {
        ContentError::Validation {
            document: None,
            section: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ContentError::Validation {
            document: None,
            section: None,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ContentError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ContentError::Storage {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        ContentError::Render {
            document: None,
            section: None,
            field: None,
            message: message.into(),
        }
    }

    /// Attach the owning document to validation and render errors
    pub fn in_document(mut self, id: Option<DocumentId>) -> Self {
        match &mut self {
            ContentError::Validation { document, .. } | ContentError::Render { document, .. } => {
                if document.is_none() {
                    *document = id;
                }
            }
            _ => {}
        }
        self
    }

    /// Attach the offending section to validation and render errors
    pub fn in_section(mut self, id: SectionId) -> Self {
        match &mut self {
            ContentError::Validation { section, .. } | ContentError::Render { section, .. } => {
                if section.is_none() {
                    *section = Some(id);
                }
            }
            _ => {}
        }
        self
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ContentError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, ContentError::Storage { .. })
    }

    pub fn is_render(&self) -> bool {
        matches!(self, ContentError::Render { .. })
    }
}

impl From<rusqlite::Error> for ContentError {
    fn from(e: rusqlite::Error) -> Self {
        ContentError::storage(format!("database: {e}"))
    }
}

impl From<rusqlite_migration::Error> for ContentError {
    fn from(e: rusqlite_migration::Error) -> Self {
        ContentError::storage(format!("migration: {e}"))
    }
}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        ContentError::storage(format!("io: {e}"))
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(e: serde_json::Error) -> Self {
        ContentError::storage(format!("serialization: {e}"))
    }
}
