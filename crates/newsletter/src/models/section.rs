//! Section model: one typed content block inside a document

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContentError, Result};

/// Identifier of a section, unique within its parent document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub u64);

impl SectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The recognised section kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Heading,
    BodyText,
    Image,
    CallToAction,
    EventListing,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Heading,
        SectionKind::BodyText,
        SectionKind::Image,
        SectionKind::CallToAction,
        SectionKind::EventListing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Heading => "heading",
            SectionKind::BodyText => "body_text",
            SectionKind::Image => "image",
            SectionKind::CallToAction => "call_to_action",
            SectionKind::EventListing => "event_listing",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = ContentError;

    /// Accepts snake_case, kebab-case and a few short aliases ("body", "cta", "events")
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "heading" => Ok(SectionKind::Heading),
            "body_text" | "body" => Ok(SectionKind::BodyText),
            "image" => Ok(SectionKind::Image),
            "call_to_action" | "cta" => Ok(SectionKind::CallToAction),
            "event_listing" | "events" => Ok(SectionKind::EventListing),
            _ => Err(ContentError::field(
                "kind",
                format!("unrecognized section kind '{s}'"),
            )),
        }
    }
}

/// Heading block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Free text; blank lines separate paragraphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyText {
    pub text: String,
}

/// Image with alt text
///
/// An empty or unusable `asset` is kept as-is and rendered as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub asset: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Button linking to a target URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToAction {
    pub label: String,
    pub url: String,
}

/// One entry of an event listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// Ordered list of events with an optional headline and closing line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListing {
    #[serde(default)]
    pub headline: String,
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<String>,
}

/// Kind-specific payload of a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionContent {
    Heading(Heading),
    BodyText(BodyText),
    Image(Image),
    CallToAction(CallToAction),
    EventListing(EventListing),
}

impl SectionContent {
    pub fn heading(text: impl Into<String>) -> Self {
        SectionContent::Heading(Heading {
            text: text.into(),
            subtitle: None,
        })
    }

    pub fn body_text(text: impl Into<String>) -> Self {
        SectionContent::BodyText(BodyText { text: text.into() })
    }

    pub fn image(asset: impl Into<String>, alt: impl Into<String>) -> Self {
        SectionContent::Image(Image {
            asset: asset.into(),
            alt: alt.into(),
            caption: None,
            link: None,
        })
    }

    pub fn call_to_action(label: impl Into<String>, url: impl Into<String>) -> Self {
        SectionContent::CallToAction(CallToAction {
            label: label.into(),
            url: url.into(),
        })
    }

    pub fn event_listing(headline: impl Into<String>, events: Vec<Event>) -> Self {
        SectionContent::EventListing(EventListing {
            headline: headline.into(),
            events,
            closing: None,
        })
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            SectionContent::Heading(_) => SectionKind::Heading,
            SectionContent::BodyText(_) => SectionKind::BodyText,
            SectionContent::Image(_) => SectionKind::Image,
            SectionContent::CallToAction(_) => SectionKind::CallToAction,
            SectionContent::EventListing(_) => SectionKind::EventListing,
        }
    }

    /// Parse raw editor fields against a kind
    ///
    /// Missing required fields fail with a validation error naming the kind.
    /// Unknown extra fields are ignored.
    pub fn from_fields(kind: SectionKind, fields: &Value) -> Result<Self> {
        if !fields.is_object() {
            return Err(ContentError::field(
                "content",
                format!("{kind} content must be an object"),
            ));
        }

        let parsed = match kind {
            SectionKind::Heading => Heading::deserialize(fields).map(SectionContent::Heading),
            SectionKind::BodyText => BodyText::deserialize(fields).map(SectionContent::BodyText),
            SectionKind::Image => Image::deserialize(fields).map(SectionContent::Image),
            SectionKind::CallToAction => {
                CallToAction::deserialize(fields).map(SectionContent::CallToAction)
            }
            SectionKind::EventListing => {
                EventListing::deserialize(fields).map(SectionContent::EventListing)
            }
        };

        parsed.map_err(|e| ContentError::field("content", format!("invalid {kind} content: {e}")))
    }

    /// All text an author typed into this section, in render order
    pub fn text_fragments(&self) -> Vec<&str> {
        match self {
            SectionContent::Heading(h) => {
                let mut out = vec![h.text.as_str()];
                out.extend(h.subtitle.as_deref());
                out
            }
            SectionContent::BodyText(b) => vec![b.text.as_str()],
            SectionContent::Image(i) => {
                let mut out = vec![i.alt.as_str()];
                out.extend(i.caption.as_deref());
                out
            }
            SectionContent::CallToAction(c) => vec![c.label.as_str()],
            SectionContent::EventListing(l) => {
                let mut out = vec![l.headline.as_str()];
                for event in &l.events {
                    out.extend([
                        event.title.as_str(),
                        event.date.as_str(),
                        event.location.as_str(),
                        event.description.as_str(),
                    ]);
                }
                out.extend(l.closing.as_deref());
                out
            }
        }
    }

    /// Problems that make this payload unusable, as (field, message) pairs
    ///
    /// Empty text and empty image assets are not problems: they render as
    /// placeholders.
    pub fn problems(&self) -> Vec<(String, String)> {
        let mut problems = Vec::new();
        match self {
            SectionContent::Heading(_) | SectionContent::BodyText(_) => {}
            SectionContent::Image(image) => {
                if let Some(link) = &image.link {
                    if let Err(message) = check_link(link) {
                        problems.push(("link".to_string(), message));
                    }
                }
            }
            SectionContent::CallToAction(cta) => {
                if cta.label.trim().is_empty() {
                    problems.push(("label".to_string(), "must not be empty".to_string()));
                }
                if let Err(message) = check_link(&cta.url) {
                    problems.push(("url".to_string(), message));
                }
            }
            SectionContent::EventListing(listing) => {
                for (i, event) in listing.events.iter().enumerate() {
                    if event.title.trim().is_empty() {
                        problems.push((
                            format!("events[{i}].title"),
                            "must not be empty".to_string(),
                        ));
                    }
                }
            }
        }
        problems
    }
}

/// Accepts absolute http(s)/mailto/tel URLs, root-relative paths and fragments
pub fn check_link(link: &str) -> std::result::Result<(), String> {
    let link = link.trim();
    if link.is_empty() {
        return Err("must not be empty".to_string());
    }
    if link.starts_with('/') || link.starts_with('#') {
        return if link.chars().any(char::is_whitespace) {
            Err(format!("'{link}' contains whitespace"))
        } else {
            Ok(())
        };
    }
    match url::Url::parse(link) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" | "mailto" | "tel" => Ok(()),
            scheme => Err(format!("unsupported URL scheme '{scheme}'")),
        },
        Err(e) => Err(format!("'{link}' is not a valid URL: {e}")),
    }
}

/// Background override of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background<'a> {
    /// `#rgb` or `#rrggbb` literal
    Hex(&'a str),
    /// Name of a brand color token
    Token(&'a str),
}

impl<'a> Background<'a> {
    pub fn parse(value: &'a str) -> std::result::Result<Self, String> {
        let value = value.trim();
        if let Some(digits) = value.strip_prefix('#') {
            let valid_len = digits.len() == 3 || digits.len() == 6;
            if valid_len && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(Background::Hex(value))
            } else {
                Err(format!("'{value}' is not a #rgb or #rrggbb color"))
            }
        } else if !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            Ok(Background::Token(value))
        } else {
            Err(format!("'{value}' is neither a hex color nor a color token name"))
        }
    }
}

/// A typed content block owned by exactly one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Ordinal position within the parent document, starting at 0
    pub position: u32,
    /// Disabled sections are kept but skipped when rendering
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional background override (hex literal or brand color token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub content: SectionContent,
}

fn default_enabled() -> bool {
    true
}

impl Section {
    pub fn new(id: SectionId, position: u32, content: SectionContent) -> Self {
        Self {
            id,
            position,
            enabled: true,
            background: None,
            content,
        }
    }

    pub fn kind(&self) -> SectionKind {
        self.content.kind()
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("heading".parse::<SectionKind>().unwrap(), SectionKind::Heading);
        assert_eq!("body-text".parse::<SectionKind>().unwrap(), SectionKind::BodyText);
        assert_eq!("CTA".parse::<SectionKind>().unwrap(), SectionKind::CallToAction);
        assert_eq!(
            "event_listing".parse::<SectionKind>().unwrap(),
            SectionKind::EventListing
        );

        let err = "carousel".parse::<SectionKind>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("carousel"));
    }

    #[test]
    fn test_from_fields_requires_kind_fields() {
        let cta = SectionContent::from_fields(
            SectionKind::CallToAction,
            &json!({"label": "Shop now", "url": "https://example.com/shop"}),
        )
        .unwrap();
        assert_eq!(cta.kind(), SectionKind::CallToAction);

        let err =
            SectionContent::from_fields(SectionKind::CallToAction, &json!({"label": "Shop now"}))
                .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("url"));

        let err = SectionContent::from_fields(SectionKind::Image, &json!("banner.png")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_event_listing_defaults() {
        let content = SectionContent::from_fields(
            SectionKind::EventListing,
            &json!({"events": [{"title": "SHOT Show", "date": "Jan 21-24"}]}),
        )
        .unwrap();

        let SectionContent::EventListing(listing) = content else {
            panic!("expected event listing");
        };
        assert_eq!(listing.headline, "");
        assert_eq!(listing.events[0].location, "");
        assert_eq!(listing.events[0].date, "Jan 21-24");
    }

    #[test]
    fn test_problems() {
        assert!(SectionContent::body_text("").problems().is_empty());
        assert!(SectionContent::image("", "missing").problems().is_empty());

        let bad = SectionContent::call_to_action("", "javascript:alert(1)").problems();
        let fields: Vec<_> = bad.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["label", "url"]);

        let events = SectionContent::event_listing(
            "See us",
            vec![Event {
                title: " ".to_string(),
                date: String::new(),
                location: String::new(),
                description: String::new(),
            }],
        );
        assert_eq!(events.problems()[0].0, "events[0].title");
    }

    #[test]
    fn test_check_link() {
        assert!(check_link("https://www.aardvarktactical.com").is_ok());
        assert!(check_link("mailto:sales@example.com").is_ok());
        assert!(check_link("/products/visor").is_ok());
        assert!(check_link("#events").is_ok());
        assert!(check_link("").is_err());
        assert!(check_link("not a url").is_err());
        assert!(check_link("ftp://example.com/file").is_err());
    }

    #[test]
    fn test_background_parse() {
        assert_eq!(Background::parse("#03253E"), Ok(Background::Hex("#03253E")));
        assert_eq!(Background::parse("#fff"), Ok(Background::Hex("#fff")));
        assert_eq!(
            Background::parse("secondary_bg"),
            Ok(Background::Token("secondary_bg"))
        );
        assert!(Background::parse("#12345").is_err());
        assert!(Background::parse("red; color: blue").is_err());
    }

    #[test]
    fn test_text_fragments_cover_events() {
        let listing = SectionContent::event_listing(
            "Where to find us",
            vec![Event {
                title: "Expo".to_string(),
                date: "May 2".to_string(),
                location: "Booth 12".to_string(),
                description: "Demos all day".to_string(),
            }],
        );
        let text = listing.text_fragments().join(" ");
        assert!(text.contains("Booth 12"));
        assert!(text.contains("Demos all day"));
    }
}
