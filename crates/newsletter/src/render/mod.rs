//! Render engine: documents to standalone HTML
//!
//! Email renders inline every style on the element itself and carry no
//! `<style>`, `<link>` or `<script>` elements. Web renders use classes, one
//! `<style>` block and optionally the brand's shared stylesheet; they never
//! include the brand footer. Output depends only on the document and brand,
//! so identical inputs give byte-identical HTML.

mod html;
mod sections;
mod styles;

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::assets::AssetLibrary;
use crate::error::{ContentError, Result};
use crate::models::{Background, Brand, Document, DocumentKind, Section, Violation};

pub use html::{html_escape, paragraphs};

/// Render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Fully inlined, footer per brand policy
    Email,
    /// Shared assets allowed, footer always suppressed
    Web,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Email => "email",
            RenderMode::Web => "web",
        }
    }

    /// Suffix used in export filenames
    pub fn file_suffix(&self) -> &'static str {
        match self {
            RenderMode::Email => "email",
            RenderMode::Web => "website",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(RenderMode::Email),
            "web" | "website" => Ok(RenderMode::Web),
            other => Err(ContentError::field(
                "mode",
                format!("unknown render mode '{other}' (expected email or web)"),
            )),
        }
    }
}

/// Render a document to a complete HTML page
///
/// Fails only when the document can't be rendered faithfully: it belongs to
/// another brand, `validate` reports a fatal violation, or a section
/// background names a color token the brand doesn't define. Everything else
/// degrades to a placeholder or default.
pub fn render(document: &Document, mode: RenderMode, brand: &Brand) -> Result<String> {
    render_with_assets(document, mode, brand, None)
}

/// [`render`], checking relative image references against an asset library
///
/// An image whose file isn't in the library renders the placeholder.
pub fn render_with_assets(
    document: &Document,
    mode: RenderMode,
    brand: &Brand,
    library: Option<&AssetLibrary>,
) -> Result<String> {
    if !brand.answers_to(document.brand.as_str()) {
        return Err(Violation::fatal(
            None,
            "brand",
            format!(
                "document belongs to brand '{}', not '{}'",
                document.brand, brand.id
            ),
        )
        .into_render_error()
        .in_document(document.id));
    }

    for violation in document.validate() {
        if !violation.recoverable {
            return Err(violation.into_render_error().in_document(document.id));
        }
        warn!(
            "[RENDER] Document {}: {violation}",
            document.id.map(|id| id.to_string()).unwrap_or_else(|| "(unsaved)".to_string())
        );
    }

    let styler = styles::Styler::new(mode, brand);
    let ctx = sections::SectionContext::new(&styler, document, brand, library);

    let mut rows = html::masthead(document, brand, &styler);
    let mut rendered = 0;
    for section in document.ordered_sections() {
        if !section.enabled {
            continue;
        }
        let background =
            resolve_background(section, brand).map_err(|e| e.in_document(document.id))?;
        rows.push_str(&sections::render_section(section, background, &ctx));
        rendered += 1;
    }
    if document.kind() == DocumentKind::Newsletter
        && rendered > 0
        && !brand.signature.trim().is_empty()
    {
        rows.push_str(&html::sign_off(brand, &styler));
    }
    if mode == RenderMode::Email && brand.footer.include_in_email {
        rows.push_str(&html::footer(brand, &styler));
    }

    debug!(
        "[RENDER] {} {} for brand {}: {rendered} of {} sections",
        mode,
        document.kind(),
        brand.id,
        document.sections().len()
    );
    Ok(html::page(document, brand, mode, &styler, &rows))
}

/// Concrete color for a section's background override
fn resolve_background<'a>(section: &'a Section, brand: &'a Brand) -> Result<Option<&'a str>> {
    let Some(value) = section.background.as_deref() else {
        return Ok(None);
    };
    let fail = |message: String| {
        Violation::fatal(Some(section.id), "background", message).into_render_error()
    };
    match Background::parse(value).map_err(fail)? {
        Background::Hex(hex) => Ok(Some(hex)),
        Background::Token(token) => brand.color(token).map(Some).ok_or_else(|| {
            fail(format!(
                "brand '{}' has no color token '{token}'",
                brand.id
            ))
        }),
    }
}
