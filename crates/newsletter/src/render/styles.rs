//! Style rules shared by both render modes
//!
//! Every styled element names a [`Rule`]. Email renders inline the rule's
//! declarations on the element; web renders emit a class and collect the
//! same declarations into one `<style>` block.

use std::fmt::Write;

use super::RenderMode;
use crate::models::Brand;

/// Resolved brand colors and metrics used by the rules
pub(crate) struct Palette<'a> {
    primary: &'a str,
    accent: &'a str,
    body_text: &'a str,
    dark_accent: &'a str,
    specs_text: &'a str,
    detail_bg: &'a str,
    border: &'a str,
    footer_text: &'a str,
    footer_muted: &'a str,
    font_family: &'a str,
    logo_width: u32,
}

impl<'a> Palette<'a> {
    pub(crate) fn from_brand(brand: &'a Brand) -> Self {
        let primary = brand.color_or("primary", "#000000");
        let accent = brand.color_or("accent", "#ffffff");
        let body_text = brand.color_or("body_text", "#333333");
        Self {
            primary,
            accent,
            body_text,
            dark_accent: brand.color_or("dark_accent", primary),
            specs_text: brand.color_or("specs_text", body_text),
            detail_bg: brand.color_or("detail_bg", "#eeeeee"),
            border: brand.color_or("border", "#cccccc"),
            footer_text: brand.color_or("footer_text", "#ffffff"),
            footer_muted: brand.color_or("footer_muted", "#999999"),
            font_family: &brand.font_family,
            logo_width: brand.header_logo().1,
        }
    }
}

/// A styled element of the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    Body,
    Wrapper,
    WrapperCell,
    Container,
    Header,
    Logo,
    TitleBar,
    TitleText,
    Section,
    EventSection,
    Heading,
    Subtitle,
    Paragraph,
    Image,
    Caption,
    Placeholder,
    CtaCell,
    CtaButton,
    CtaLink,
    EventHeadline,
    EventTitle,
    EventDetail,
    EventDivider,
    Closing,
    SignOff,
    Signature,
    Footer,
    Tagline,
    FooterLinks,
    FooterLink,
    FooterSeparator,
    Unsubscribe,
    UnsubscribeLink,
}

impl Rule {
    pub(crate) const ALL: [Rule; 33] = [
        Rule::Body,
        Rule::Wrapper,
        Rule::WrapperCell,
        Rule::Container,
        Rule::Header,
        Rule::Logo,
        Rule::TitleBar,
        Rule::TitleText,
        Rule::Section,
        Rule::EventSection,
        Rule::Heading,
        Rule::Subtitle,
        Rule::Paragraph,
        Rule::Image,
        Rule::Caption,
        Rule::Placeholder,
        Rule::CtaCell,
        Rule::CtaButton,
        Rule::CtaLink,
        Rule::EventHeadline,
        Rule::EventTitle,
        Rule::EventDetail,
        Rule::EventDivider,
        Rule::Closing,
        Rule::SignOff,
        Rule::Signature,
        Rule::Footer,
        Rule::Tagline,
        Rule::FooterLinks,
        Rule::FooterLink,
        Rule::FooterSeparator,
        Rule::Unsubscribe,
        Rule::UnsubscribeLink,
    ];

    pub(crate) fn class(self) -> &'static str {
        match self {
            Rule::Body => "pr-body",
            Rule::Wrapper => "pr-wrapper",
            Rule::WrapperCell => "pr-wrapper-cell",
            Rule::Container => "pr-container",
            Rule::Header => "pr-header",
            Rule::Logo => "pr-logo",
            Rule::TitleBar => "pr-title-bar",
            Rule::TitleText => "pr-title-text",
            Rule::Section => "pr-section",
            Rule::EventSection => "pr-event-section",
            Rule::Heading => "pr-heading",
            Rule::Subtitle => "pr-subtitle",
            Rule::Paragraph => "pr-paragraph",
            Rule::Image => "pr-image",
            Rule::Caption => "pr-caption",
            Rule::Placeholder => "pr-placeholder",
            Rule::CtaCell => "pr-cta-cell",
            Rule::CtaButton => "pr-cta-button",
            Rule::CtaLink => "pr-cta-link",
            Rule::EventHeadline => "pr-event-headline",
            Rule::EventTitle => "pr-event-title",
            Rule::EventDetail => "pr-event-detail",
            Rule::EventDivider => "pr-event-divider",
            Rule::Closing => "pr-closing",
            Rule::SignOff => "pr-sign-off",
            Rule::Signature => "pr-signature",
            Rule::Footer => "pr-footer",
            Rule::Tagline => "pr-tagline",
            Rule::FooterLinks => "pr-footer-links",
            Rule::FooterLink => "pr-footer-link",
            Rule::FooterSeparator => "pr-footer-separator",
            Rule::Unsubscribe => "pr-unsubscribe",
            Rule::UnsubscribeLink => "pr-unsubscribe-link",
        }
    }

    pub(crate) fn declarations(self, p: &Palette<'_>) -> String {
        match self {
            Rule::Body => format!(
                "margin: 0; padding: 0; background-color: #f4f4f4; font-family: {};",
                p.font_family
            ),
            Rule::Wrapper => "background-color: #f4f4f4;".to_string(),
            Rule::WrapperCell => "padding: 20px 0;".to_string(),
            Rule::Container => "background-color: #ffffff; max-width: 600px;".to_string(),
            Rule::Header => format!(
                "background-color: {}; padding: 30px 20px; text-align: center;",
                p.primary
            ),
            Rule::Logo => format!(
                "display: block; margin: 0 auto; max-width: {}px; height: auto;",
                p.logo_width
            ),
            Rule::TitleBar => format!(
                "background-color: {}; padding: 12px 20px; text-align: center;",
                p.accent
            ),
            Rule::TitleText => format!(
                "margin: 0; font-size: 14px; font-weight: bold; color: {}; \
                 text-transform: uppercase; letter-spacing: 1px;",
                p.primary
            ),
            Rule::Section => "padding: 30px 40px; background-color: #ffffff;".to_string(),
            Rule::EventSection => {
                format!("padding: 30px 40px; background-color: {};", p.accent)
            }
            Rule::Heading => format!(
                "margin: 0 0 15px 0; font-size: 24px; line-height: 1.3; font-weight: bold; \
                 color: {}; text-transform: uppercase;",
                p.primary
            ),
            Rule::Subtitle => format!(
                "margin: 0; font-size: 18px; line-height: 1.5; color: {}; font-weight: 600;",
                p.body_text
            ),
            Rule::Paragraph => format!(
                "margin: 0 0 15px 0; font-size: 16px; line-height: 1.6; color: {};",
                p.body_text
            ),
            Rule::Image => {
                "display: block; width: 100%; height: auto; border: 0; border-radius: 4px;"
                    .to_string()
            }
            Rule::Caption => format!(
                "margin: 10px 0 0 0; font-size: 14px; line-height: 1.6; color: {}; \
                 font-style: italic;",
                p.specs_text
            ),
            Rule::Placeholder => format!(
                "padding: 40px 20px; text-align: center; font-size: 14px; color: {}; \
                 background-color: {}; border: 1px dashed {};",
                p.body_text, p.detail_bg, p.border
            ),
            Rule::CtaCell => "padding-top: 5px;".to_string(),
            Rule::CtaButton => format!("background-color: {}; border-radius: 4px;", p.accent),
            Rule::CtaLink => format!(
                "display: inline-block; padding: 14px 28px; font-size: 16px; font-weight: bold; \
                 color: {}; text-decoration: none; text-transform: uppercase; \
                 letter-spacing: 0.5px;",
                p.primary
            ),
            Rule::EventHeadline => format!(
                "margin: 0 0 15px 0; font-size: 24px; font-weight: bold; color: {}; \
                 text-transform: uppercase; text-align: center;",
                p.primary
            ),
            Rule::EventTitle => format!(
                "margin: 0 0 10px 0; font-size: 18px; line-height: 1.5; color: {}; \
                 text-align: center; font-weight: 600;",
                p.dark_accent
            ),
            Rule::EventDetail => format!(
                "margin: 0 0 5px 0; font-size: 16px; line-height: 1.6; color: {}; \
                 text-align: center;",
                p.primary
            ),
            Rule::EventDivider => format!(
                "border: none; border-top: 1px solid {}; margin: 25px 40px; opacity: 0.3;",
                p.primary
            ),
            Rule::Closing => format!(
                "margin: 25px 0 0 0; font-size: 16px; line-height: 1.6; color: {}; \
                 text-align: center; font-style: italic; font-weight: 600;",
                p.dark_accent
            ),
            Rule::SignOff => "padding: 0 40px 30px 40px; background-color: #ffffff;".to_string(),
            Rule::Signature => format!(
                "margin: 0; font-size: 16px; line-height: 1.6; color: {}; font-weight: 600;",
                p.primary
            ),
            Rule::Footer => format!(
                "background-color: {}; padding: 30px 40px; text-align: center;",
                p.primary
            ),
            Rule::Tagline => format!(
                "margin: 0 0 15px 0; font-size: 14px; line-height: 1.6; color: {}; \
                 font-style: italic;",
                p.footer_text
            ),
            Rule::FooterLinks => "padding: 10px 0;".to_string(),
            Rule::FooterLink => format!(
                "color: {}; text-decoration: none; font-size: 14px; margin: 0 10px;",
                p.accent
            ),
            Rule::FooterSeparator => format!("color: {}; margin: 0 5px;", p.footer_muted),
            Rule::Unsubscribe => {
                format!("margin: 20px 0 0 0; font-size: 12px; color: {};", p.footer_muted)
            }
            Rule::UnsubscribeLink => {
                format!("color: {}; text-decoration: underline;", p.footer_muted)
            }
        }
    }
}

/// Turns rules into element attributes for one render mode
pub(crate) struct Styler<'a> {
    mode: RenderMode,
    palette: Palette<'a>,
}

impl<'a> Styler<'a> {
    pub(crate) fn new(mode: RenderMode, brand: &'a Brand) -> Self {
        Self {
            mode,
            palette: Palette::from_brand(brand),
        }
    }

    /// ` style="…"` in email mode, ` class="…"` in web mode
    pub(crate) fn attr(&self, rule: Rule) -> String {
        match self.mode {
            RenderMode::Email => format!(r#" style="{}""#, rule.declarations(&self.palette)),
            RenderMode::Web => format!(r#" class="{}""#, rule.class()),
        }
    }

    /// Like [`Styler::attr`], with a background color override
    pub(crate) fn attr_with_background(&self, rule: Rule, background: Option<&str>) -> String {
        let Some(color) = background else {
            return self.attr(rule);
        };
        match self.mode {
            RenderMode::Email => format!(
                r#" style="{} background-color: {color};""#,
                rule.declarations(&self.palette)
            ),
            RenderMode::Web => format!(
                r#" class="{}" style="background-color: {color};""#,
                rule.class()
            ),
        }
    }

    /// Stylesheet for web renders: brand tokens as custom properties, then every rule
    pub(crate) fn stylesheet(&self, brand: &Brand) -> String {
        let mut css = String::from(":root {\n");
        for (token, value) in &brand.colors {
            let _ = writeln!(css, "    --pr-{}: {value};", token.replace('_', "-"));
        }
        css.push_str("}\n");
        for rule in Rule::ALL {
            let _ = writeln!(
                css,
                ".{} {{ {} }}",
                rule.class(),
                rule.declarations(&self.palette)
            );
        }
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brands::BrandRegistry;
    use std::collections::HashSet;

    #[test]
    fn test_class_names_unique() {
        let classes: HashSet<_> = Rule::ALL.iter().map(|r| r.class()).collect();
        assert_eq!(classes.len(), Rule::ALL.len());
    }

    #[test]
    fn test_email_attr_inlines_brand_colors() {
        let registry = BrandRegistry::builtin();
        let brand = registry.get("aardvark").unwrap();
        let styler = Styler::new(RenderMode::Email, brand);

        let attr = styler.attr(Rule::Header);
        assert!(attr.starts_with(" style=\""));
        assert!(attr.contains("#03253E"));

        let attr = styler.attr_with_background(Rule::Section, Some("#abcdef"));
        assert!(attr.ends_with("background-color: #abcdef;\""));
    }

    #[test]
    fn test_web_attr_uses_classes() {
        let registry = BrandRegistry::builtin();
        let brand = registry.get("project7").unwrap();
        let styler = Styler::new(RenderMode::Web, brand);

        assert_eq!(styler.attr(Rule::Heading), r#" class="pr-heading""#);
        let css = styler.stylesheet(brand);
        assert!(css.contains("--pr-primary-olive: #757A4D;"));
        assert!(css.contains(".pr-heading {"));
    }
}
