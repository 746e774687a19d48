//! Brand registry
//!
//! Brands are static configuration: the built-in set ships with the binary
//! and can be replaced by a JSON file at startup. Once installed with
//! [`init`], the registry is immutable for the life of the process.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::{info, warn};

use crate::error::{ContentError, Result};
use crate::models::{Brand, BrandId, FooterPolicy};

/// Color tokens every brand must define
pub const REQUIRED_COLORS: [&str; 3] = ["primary", "accent", "body_text"];

/// Process-wide registry, set once at startup
static REGISTRY: OnceLock<Arc<BrandRegistry>> = OnceLock::new();

/// Read-only lookup from brand id to brand configuration
#[derive(Debug, Clone)]
pub struct BrandRegistry {
    brands: BTreeMap<BrandId, Brand>,
}

impl BrandRegistry {
    /// Build a registry, rejecting duplicate ids and brands missing required colors
    pub fn new(brands: Vec<Brand>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for brand in brands {
            if brand.id.as_str().trim().is_empty() {
                return Err(ContentError::field("id", "brand id must not be empty"));
            }
            for token in REQUIRED_COLORS {
                if brand.color(token).is_none() {
                    return Err(ContentError::field(
                        format!("colors.{token}"),
                        format!("brand '{}' is missing required color", brand.id),
                    ));
                }
            }
            if let Some(existing) = map.insert(brand.id.clone(), brand) {
                return Err(ContentError::field(
                    "id",
                    format!("duplicate brand id '{}'", existing.id),
                ));
            }
        }
        Ok(Self { brands: map })
    }

    /// The brands shipped with Pressroom
    pub fn builtin() -> Self {
        let brands = [aardvark(), project7()]
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();
        Self { brands }
    }

    /// Load brands from a JSON array of brand objects
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let brands: Vec<Brand> = config::load_json_file(path)
            .map_err(|e| ContentError::storage(format!("{e:#}")))?;
        let registry = Self::new(brands)?;
        info!(
            "[BRANDS] Loaded {} brands from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Load from `path` when given, otherwise the built-in brands
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Look up a brand by id, or by display name ignoring case
    pub fn get(&self, id: &str) -> Result<&Brand> {
        if let Some(brand) = self.brands.get(&BrandId::from(id)) {
            return Ok(brand);
        }
        self.brands
            .values()
            .find(|b| b.answers_to(id))
            .ok_or_else(|| ContentError::not_found(format!("brand '{id}'")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brand> {
        self.brands.values()
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

/// Install the process-wide registry
///
/// The first call wins; later calls keep the installed registry and return it.
pub fn init(registry: BrandRegistry) -> Arc<BrandRegistry> {
    let mut installed = false;
    let current = REGISTRY.get_or_init(|| {
        installed = true;
        Arc::new(registry)
    });
    if !installed {
        warn!("[BRANDS] Registry already initialized, keeping the existing one");
    }
    Arc::clone(current)
}

/// The process-wide registry, defaulting to the built-in brands
pub fn global() -> Arc<BrandRegistry> {
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(BrandRegistry::builtin())))
}

fn colors(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn aardvark() -> Brand {
    Brand {
        id: BrandId::new("aardvark"),
        display_name: "AARDVARK Tactical".to_string(),
        logo_url: "https://aardimg-20b64.kxcdn.com/web/image/website/3/logo/AARDVARK?unique=9f3b3b6"
            .to_string(),
        icon_url: "https://aardimg-20b64.kxcdn.com/web/image/20063-43070711/02b_aard_logo_notagln_ko_nobckgrnd.png"
            .to_string(),
        use_icon_header: true,
        colors: colors(&[
            ("primary", "#03253E"),
            ("accent", "#F3E500"),
            ("slate_blue", "#4B5E6F"),
            ("sky_blue", "#E3E8EE"),
            ("lt_sky_blue", "#EAEFF3"),
            ("lt_beige", "#DBD8CF"),
            ("secondary_bg", "#E3E8EE"),
            ("detail_bg", "#EAEFF3"),
            ("body_text", "#333333"),
            ("specs_text", "#4B5E6F"),
            ("footer_text", "#E3E8EE"),
            ("footer_muted", "#4B5E6F"),
            ("dark_accent", "#03253E"),
            ("border", "#DBD8CF"),
        ]),
        font_family: "Arial, Helvetica, sans-serif".to_string(),
        newsletter_name: "AARD Report".to_string(),
        tagline: "AARDVARK finds, develops, and manufactures purpose-built products that enhance tactical operator safety.".to_string(),
        signature: "\u{2014}The AARDVARK Team".to_string(),
        website_url: "https://www.aardvarktactical.com".to_string(),
        contact_url: "https://www.aardvarktactical.com/contactus".to_string(),
        asset_base_url: None,
        web_stylesheet: None,
        footer: FooterPolicy::default(),
    }
}

fn project7() -> Brand {
    Brand {
        id: BrandId::new("project7"),
        display_name: "PROJECT7 Armor".to_string(),
        logo_url: "https://p7img-20b64.kxcdn.com/web/image/website/2/logo/PROJECT7%20ARMOR?unique=4974767"
            .to_string(),
        icon_url: String::new(),
        use_icon_header: false,
        colors: colors(&[
            ("primary", "#565C43"),
            ("primary_olive", "#757A4D"),
            ("primary_black", "#2D2A26"),
            ("accent", "#C0D330"),
            ("cool_grey", "#76777B"),
            ("black", "#000000"),
            ("secondary_bg", "#CCCAC2"),
            ("detail_bg", "#E6E7E8"),
            ("warm_grey", "#9D9D8D"),
            ("body_text", "#333333"),
            ("specs_text", "#666666"),
            ("footer_text", "#CCCAC2"),
            ("footer_muted", "#9D9D8D"),
            ("dark_accent", "#2D2A26"),
            ("border", "#CCCAC2"),
        ]),
        font_family: "Arial, Helvetica, sans-serif".to_string(),
        newsletter_name: "Field Notes".to_string(),
        tagline: "PROJECT7 builds tactical equipment based on operator feedback. We solve specific problems, not everything.".to_string(),
        signature: "\u{2014}The PROJECT7 Team".to_string(),
        website_url: "https://www.project7armor.com".to_string(),
        contact_url: "https://www.project7armor.com/pages/contact-us-helpdesk".to_string(),
        asset_base_url: None,
        web_stylesheet: None,
        footer: FooterPolicy::default(),
    }
}
