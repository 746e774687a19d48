//! Page shell: document head, brand header, title bar and footer

use super::RenderMode;
use super::styles::{Rule, Styler};
use crate::models::{Brand, Document, DocumentDetails};

/// Simple HTML escape for user-generated content
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Split author text into escaped paragraphs
///
/// Blank lines separate paragraphs; single newlines become `<br>`.
pub fn paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(join_lines(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(join_lines(&current));
    }
    out
}

fn join_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| html_escape(l.trim_end()))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Text shown in the title bar
pub(crate) fn title_bar_text(document: &Document, brand: &Brand) -> String {
    match &document.details {
        DocumentDetails::Newsletter { month, year } => {
            format!("{} \u{2013} {} {}", brand.newsletter_name, month.trim(), year)
        }
        DocumentDetails::Eblast { subject_line } => subject_line
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(Some(document.title.trim()).filter(|t| !t.is_empty()))
            .unwrap_or(&brand.newsletter_name)
            .to_string(),
    }
}

/// Contents of the `<title>` element
fn page_title(document: &Document, brand: &Brand) -> String {
    match &document.details {
        DocumentDetails::Newsletter { month, year } => {
            format!("{} - {} {}", brand.newsletter_name, month.trim(), year)
        }
        DocumentDetails::Eblast { .. } => title_bar_text(document, brand),
    }
}

/// Wrap rendered rows into a complete HTML5 page
pub(crate) fn page(
    document: &Document,
    brand: &Brand,
    mode: RenderMode,
    styler: &Styler<'_>,
    rows: &str,
) -> String {
    let head_assets = match mode {
        RenderMode::Email => String::new(),
        RenderMode::Web => {
            let mut assets = format!("<style>\n{}</style>\n", styler.stylesheet(brand));
            if let Some(href) = &brand.web_stylesheet {
                assets.push_str(&format!(
                    "<link rel=\"stylesheet\" href=\"{}\">\n",
                    html_escape(href)
                ));
            }
            assets
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
{head_assets}</head>
<body{body}>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0"{wrapper}>
<tr>
<td align="center"{wrapper_cell}>
<table role="presentation" width="600" cellpadding="0" cellspacing="0" border="0"{container}>
{rows}</table>
</td>
</tr>
</table>
</body>
</html>
"#,
        title = html_escape(&page_title(document, brand)),
        body = styler.attr(Rule::Body),
        wrapper = styler.attr(Rule::Wrapper),
        wrapper_cell = styler.attr(Rule::WrapperCell),
        container = styler.attr(Rule::Container),
    )
}

/// Brand header with logo (or icon) and the title bar
pub(crate) fn masthead(document: &Document, brand: &Brand, styler: &Styler<'_>) -> String {
    let (logo_url, logo_width) = brand.header_logo();
    format!(
        r#"<tr>
<td{header}>
<img src="{src}" alt="{alt}" width="{logo_width}"{logo}>
</td>
</tr>
<tr>
<td{title_bar}>
<p{title_text}>{text}</p>
</td>
</tr>
"#,
        header = styler.attr(Rule::Header),
        src = html_escape(logo_url),
        alt = html_escape(&brand.display_name),
        logo = styler.attr(Rule::Logo),
        title_bar = styler.attr(Rule::TitleBar),
        title_text = styler.attr(Rule::TitleText),
        text = html_escape(&title_bar_text(document, brand)),
    )
}

/// Brand footer: tagline, links and unsubscribe
///
/// Carries `brand.footer_marker()` so callers can detect the block.
/// Closing row carrying the brand's signature line
pub(crate) fn sign_off(brand: &Brand, styler: &Styler<'_>) -> String {
    format!(
        "<tr>\n<td{}>\n<p{}>{}</p>\n</td>\n</tr>\n",
        styler.attr(Rule::SignOff),
        styler.attr(Rule::Signature),
        html_escape(brand.signature.trim())
    )
}

pub(crate) fn footer(brand: &Brand, styler: &Styler<'_>) -> String {
    let link = |href: &str, label: &str| {
        let href = if href.trim().is_empty() { "#" } else { href };
        format!(
            "<a href=\"{}\"{}>{label}</a>",
            html_escape(href),
            styler.attr(Rule::FooterLink)
        )
    };
    let separator = format!("<span{}>|</span>", styler.attr(Rule::FooterSeparator));

    let tagline = if brand.tagline.trim().is_empty() {
        String::new()
    } else {
        format!(
            "<p{}>{}</p>\n",
            styler.attr(Rule::Tagline),
            html_escape(&brand.tagline)
        )
    };

    format!(
        r#"<!-- {marker} -->
<tr>
<td{footer}>
{tagline}<table role="presentation" cellpadding="0" cellspacing="0" border="0" width="100%">
<tr>
<td align="center"{links}>
{website}
{separator}
{contact}
{separator}
{preferences}
</td>
</tr>
</table>
<p{unsubscribe}><a href="{unsubscribe_href}"{unsubscribe_link}>Unsubscribe</a></p>
</td>
</tr>
"#,
        marker = brand.footer_marker(),
        footer = styler.attr(Rule::Footer),
        links = styler.attr(Rule::FooterLinks),
        website = link(&brand.website_url, "Website"),
        contact = link(&brand.contact_url, "Contact"),
        preferences = link(&brand.footer.preferences_url, "Update Preferences"),
        unsubscribe = styler.attr(Rule::Unsubscribe),
        unsubscribe_href = html_escape(&brand.footer.unsubscribe_url),
        unsubscribe_link = styler.attr(Rule::UnsubscribeLink),
    )
}
