//! Brand model: visual identity applied when rendering

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a brand (short slug, e.g. "aardvark")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrandId(pub String);

impl BrandId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BrandId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BrandId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Footer block appended to email renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterPolicy {
    /// Whether email renders carry the footer (web renders never do)
    #[serde(default = "default_true")]
    pub include_in_email: bool,
    #[serde(default = "default_preferences_url")]
    pub preferences_url: String,
    #[serde(default = "default_unsubscribe_url")]
    pub unsubscribe_url: String,
}

fn default_true() -> bool {
    true
}

fn default_preferences_url() -> String {
    "YOUR_PREFERENCES_URL".to_string()
}

fn default_unsubscribe_url() -> String {
    "YOUR_UNSUBSCRIBE_URL".to_string()
}

impl Default for FooterPolicy {
    fn default() -> Self {
        Self {
            include_in_email: true,
            preferences_url: default_preferences_url(),
            unsubscribe_url: default_unsubscribe_url(),
        }
    }
}

/// A brand's static configuration
///
/// Color tokens are looked up by name; the renderer requires `primary`,
/// `accent` and `body_text` and falls back to sensible values for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub display_name: String,
    pub logo_url: String,
    /// Compact mark used instead of the logo when `use_icon_header` is set
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub use_icon_header: bool,
    pub colors: BTreeMap<String, String>,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Masthead name printed in the title bar (e.g. "AARD Report")
    pub newsletter_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub contact_url: String,
    /// Base URL that relative image references are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_base_url: Option<String>,
    /// Shared stylesheet referenced by web renders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_stylesheet: Option<String>,
    #[serde(default)]
    pub footer: FooterPolicy,
}

fn default_font_family() -> String {
    "Arial, Helvetica, sans-serif".to_string()
}

impl Brand {
    /// Look up a color token
    pub fn color(&self, token: &str) -> Option<&str> {
        self.colors.get(token).map(String::as_str)
    }

    /// Look up a color token with a fallback for optional tokens
    pub fn color_or<'a>(&'a self, token: &str, fallback: &'a str) -> &'a str {
        self.color(token).unwrap_or(fallback)
    }

    /// Marker embedded in the footer block, used to detect its presence
    pub fn footer_marker(&self) -> String {
        format!("brand-footer:{}", self.id)
    }

    /// Logo (or icon) URL and pixel width used in the header
    pub fn header_logo(&self) -> (&str, u32) {
        if self.use_icon_header && !self.icon_url.is_empty() {
            (&self.icon_url, 120)
        } else {
            (&self.logo_url, 240)
        }
    }

    /// Lowercase slug used in export filenames
    pub fn slug(&self) -> &str {
        self.id.as_str()
    }

    /// Whether `name` refers to this brand, by id or display name
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        self.id.as_str().eq_ignore_ascii_case(name) || self.display_name.eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_brand() -> Brand {
        let json = r##"{
            "id": "sample",
            "display_name": "Sample Co",
            "logo_url": "https://cdn.example.com/logo.png",
            "icon_url": "https://cdn.example.com/icon.png",
            "use_icon_header": true,
            "colors": {"primary": "#111111", "accent": "#eeeeee", "body_text": "#333333"},
            "newsletter_name": "Sample Notes"
        }"##;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let brand = sample_brand();
        assert_eq!(brand.font_family, "Arial, Helvetica, sans-serif");
        assert!(brand.footer.include_in_email);
        assert_eq!(brand.footer.unsubscribe_url, "YOUR_UNSUBSCRIBE_URL");
        assert!(brand.web_stylesheet.is_none());
    }

    #[test]
    fn test_header_logo_prefers_icon() {
        let mut brand = sample_brand();
        assert_eq!(brand.header_logo(), ("https://cdn.example.com/icon.png", 120));

        brand.use_icon_header = false;
        assert_eq!(brand.header_logo(), ("https://cdn.example.com/logo.png", 240));
    }

    #[test]
    fn test_color_lookup() {
        let brand = sample_brand();
        assert_eq!(brand.color("primary"), Some("#111111"));
        assert_eq!(brand.color("sky_blue"), None);
        assert_eq!(brand.color_or("border", "#dddddd"), "#dddddd");
    }

    #[test]
    fn test_answers_to() {
        let brand = sample_brand();
        assert!(brand.answers_to("sample"));
        assert!(brand.answers_to(" SAMPLE CO "));
        assert!(!brand.answers_to("Sample Notes"));
    }

    #[test]
    fn test_footer_marker() {
        assert_eq!(sample_brand().footer_marker(), "brand-footer:sample");
    }
}
