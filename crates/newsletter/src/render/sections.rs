//! Per-kind section markup

use log::warn;
use url::Url;

use super::html::{html_escape, paragraphs};
use super::styles::{Rule, Styler};
use crate::assets::AssetLibrary;
use crate::models::{
    Brand, CallToAction, Document, EventListing, Heading, Image, Section, SectionContent,
};

/// Everything a section needs besides itself
pub(crate) struct SectionContext<'a> {
    styler: &'a Styler<'a>,
    document: &'a Document,
    asset_base: Option<Url>,
    library: Option<&'a AssetLibrary>,
}

impl<'a> SectionContext<'a> {
    pub(crate) fn new(
        styler: &'a Styler<'a>,
        document: &'a Document,
        brand: &Brand,
        library: Option<&'a AssetLibrary>,
    ) -> Self {
        let asset_base = brand.asset_base_url.as_deref().and_then(|base| {
            Url::parse(base)
                .inspect_err(|e| {
                    warn!(
                        "[RENDER] Brand '{}' has an unusable asset base '{base}': {e}",
                        brand.id
                    )
                })
                .ok()
        });
        Self {
            styler,
            document,
            asset_base,
            library,
        }
    }

    fn attr(&self, rule: Rule) -> String {
        self.styler.attr(rule)
    }
}

/// Render one enabled section as a container row
pub(crate) fn render_section(
    section: &Section,
    background: Option<&str>,
    ctx: &SectionContext<'_>,
) -> String {
    let (cell_rule, inner) = match &section.content {
        SectionContent::Heading(heading) => (Rule::Section, render_heading(heading, ctx)),
        SectionContent::BodyText(body) => (Rule::Section, render_body(&body.text, ctx)),
        SectionContent::Image(image) => (Rule::Section, render_image(section, image, ctx)),
        SectionContent::CallToAction(cta) => (Rule::Section, render_cta(cta, ctx)),
        SectionContent::EventListing(listing) => {
            (Rule::EventSection, render_event_listing(listing, ctx))
        }
    };

    format!(
        "<tr data-section=\"{id}\" data-kind=\"{kind}\">\n<td{cell}>\n{inner}</td>\n</tr>\n",
        id = section.id,
        kind = section.kind(),
        cell = ctx.styler.attr_with_background(cell_rule, background),
    )
}

fn render_heading(heading: &Heading, ctx: &SectionContext<'_>) -> String {
    let mut out = String::new();
    let text = if heading.text.trim().is_empty() {
        ctx.document.title.trim()
    } else {
        heading.text.trim()
    };
    if !text.is_empty() {
        out.push_str(&format!("<h2{}>{}</h2>\n", ctx.attr(Rule::Heading), html_escape(text)));
    }
    if let Some(subtitle) = heading.subtitle.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "<p{}>{}</p>\n",
            ctx.attr(Rule::Subtitle),
            html_escape(subtitle.trim())
        ));
    }
    out
}

fn render_body(text: &str, ctx: &SectionContext<'_>) -> String {
    let paragraphs = paragraphs(text);
    if paragraphs.is_empty() {
        // Keep the row's height so the layout doesn't collapse
        return format!("<p{}>&nbsp;</p>\n", ctx.attr(Rule::Paragraph));
    }
    paragraphs
        .iter()
        .map(|p| format!("<p{}>{p}</p>\n", ctx.attr(Rule::Paragraph)))
        .collect()
}

fn render_image(section: &Section, image: &Image, ctx: &SectionContext<'_>) -> String {
    let alt = image.alt.trim();
    let mut out = match resolve_asset(&image.asset, ctx.asset_base.as_ref(), ctx.library) {
        Some(src) => {
            let img = format!(
                "<img src=\"{}\" alt=\"{}\" width=\"520\"{}>",
                html_escape(&src),
                html_escape(alt),
                ctx.attr(Rule::Image)
            );
            match image.link.as_deref().filter(|l| !l.trim().is_empty()) {
                Some(link) => format!("<a href=\"{}\">{img}</a>\n", html_escape(link.trim())),
                None => format!("{img}\n"),
            }
        }
        None => {
            warn!(
                "[RENDER] Section {} has no usable image asset ('{}'), rendering placeholder",
                section.id, image.asset
            );
            let label = if alt.is_empty() {
                "Image unavailable".to_string()
            } else {
                format!("Image unavailable: {}", html_escape(alt))
            };
            format!("<div{}>{label}</div>\n", ctx.attr(Rule::Placeholder))
        }
    };

    if let Some(caption) = image.caption.as_deref().filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!(
            "<p{}>{}</p>\n",
            ctx.attr(Rule::Caption),
            html_escape(caption.trim())
        ));
    }
    out
}

fn render_cta(cta: &CallToAction, ctx: &SectionContext<'_>) -> String {
    format!(
        r#"<table role="presentation" cellpadding="0" cellspacing="0" border="0" width="100%">
<tr>
<td align="center"{cell}>
<table role="presentation" cellpadding="0" cellspacing="0" border="0">
<tr>
<td{button}>
<a href="{href}"{link}>{label}</a>
</td>
</tr>
</table>
</td>
</tr>
</table>
"#,
        cell = ctx.attr(Rule::CtaCell),
        button = ctx.attr(Rule::CtaButton),
        href = html_escape(cta.url.trim()),
        link = ctx.attr(Rule::CtaLink),
        label = html_escape(cta.label.trim()),
    )
}

fn render_event_listing(listing: &EventListing, ctx: &SectionContext<'_>) -> String {
    let mut out = String::new();
    if !listing.headline.trim().is_empty() {
        out.push_str(&format!(
            "<h2{}>{}</h2>\n",
            ctx.attr(Rule::EventHeadline),
            html_escape(listing.headline.trim())
        ));
    }

    for (i, event) in listing.events.iter().enumerate() {
        if i > 0 {
            out.push_str(&format!("<hr{}>\n", ctx.attr(Rule::EventDivider)));
        }
        out.push_str(&format!(
            "<p{}>{}</p>\n",
            ctx.attr(Rule::EventTitle),
            html_escape(event.title.trim())
        ));
        for detail in [&event.date, &event.location] {
            if !detail.trim().is_empty() {
                out.push_str(&format!(
                    "<p{}>{}</p>\n",
                    ctx.attr(Rule::EventDetail),
                    html_escape(detail.trim())
                ));
            }
        }
        for paragraph in paragraphs(&event.description) {
            out.push_str(&format!("<p{}>{paragraph}</p>\n", ctx.attr(Rule::EventDetail)));
        }
    }

    if let Some(closing) = listing.closing.as_deref().filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!(
            "<p{}>{}</p>\n",
            ctx.attr(Rule::Closing),
            html_escape(closing.trim())
        ));
    }
    out
}

/// Resolve an image reference to a usable `src`
///
/// Absolute http(s) and data URLs are used as is; relative references are
/// joined onto the brand's asset base when it has one. With a library, a
/// relative reference must name a file the library holds. Anything else is
/// unusable.
pub(crate) fn resolve_asset(
    asset: &str,
    base: Option<&Url>,
    library: Option<&AssetLibrary>,
) -> Option<String> {
    let asset = asset.trim();
    if asset.is_empty() || asset.chars().any(char::is_whitespace) {
        return None;
    }
    match Url::parse(asset) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "data").then(|| asset.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if library.is_some_and(|library| !library.contains(asset)) {
                return None;
            }
            match base {
                Some(base) => base.join(asset).ok().map(String::from),
                None => Some(asset.to_string()),
            }
        }
        Err(_) => None,
    }
}
