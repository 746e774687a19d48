//! Invariant violations reported by `Document::validate`

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SectionId;
use crate::error::ContentError;

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Offending section, if the violation is section-scoped
    pub section: Option<SectionId>,
    /// Offending field (e.g. "position", "url", "events[2].title")
    pub field: String,
    pub message: String,
    /// Whether rendering can substitute a safe default
    pub recoverable: bool,
}

impl Violation {
    pub fn fatal(section: Option<SectionId>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section,
            field: field.into(),
            message: message.into(),
            recoverable: false,
        }
    }

    pub fn recoverable(
        section: Option<SectionId>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            section,
            field: field.into(),
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn into_validation_error(self) -> ContentError {
        ContentError::Validation {
            document: None,
            section: self.section,
            field: Some(self.field),
            message: self.message,
        }
    }

    pub fn into_render_error(self) -> ContentError {
        ContentError::Render {
            document: None,
            section: self.section,
            field: Some(self.field),
            message: self.message,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Some(section) => write!(f, "section {section} {}: {}", self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}
