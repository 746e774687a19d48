//! Export naming and output

use serde::{Deserialize, Serialize};

use crate::models::{Brand, Document, DocumentDetails};
use crate::render::RenderMode;

/// A rendered document ready to be written or served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedDocument {
    pub filename: String,
    pub html: String,
}

/// File name for an exported render
///
/// Newsletters: `{brand}_{month}_{year}_{title}_{email|website}.html`;
/// eblasts: `{brand}_eblast_{title}_{email|website}.html`.
pub fn export_filename(document: &Document, brand: &Brand, mode: RenderMode) -> String {
    let title = safe_component(&document.title);
    let title = if title.is_empty() { "untitled".to_string() } else { title };

    match &document.details {
        DocumentDetails::Newsletter { month, year } => format!(
            "{}_{}_{}_{}_{}.html",
            brand.slug(),
            safe_component(month),
            year,
            title,
            mode.file_suffix()
        ),
        DocumentDetails::Eblast { .. } => format!(
            "{}_eblast_{}_{}.html",
            brand.slug(),
            title,
            mode.file_suffix()
        ),
    }
}

/// Keep alphanumerics, space, `-` and `_`; trim; spaces become `_`
fn safe_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brands::BrandRegistry;

    #[test]
    fn test_newsletter_filename() {
        let registry = BrandRegistry::builtin();
        let brand = registry.get("aardvark").unwrap();
        let doc = Document::newsletter("aardvark", " Q3 Update: Gear & Grit! ", "September", 2025);

        assert_eq!(
            export_filename(&doc, brand, RenderMode::Email),
            "aardvark_September_2025_Q3_Update_Gear__Grit_email.html"
        );
        assert_eq!(
            export_filename(&doc, brand, RenderMode::Web),
            "aardvark_September_2025_Q3_Update_Gear__Grit_website.html"
        );
    }

    #[test]
    fn test_eblast_filename() {
        let registry = BrandRegistry::builtin();
        let brand = registry.get("project7").unwrap();
        let doc = Document::eblast("project7", "???", None);

        assert_eq!(
            export_filename(&doc, brand, RenderMode::Email),
            "project7_eblast_untitled_email.html"
        );
    }
}
