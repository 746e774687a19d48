//! Domain models for newsletter content

mod asset;
mod brand;
mod document;
mod section;
mod validation;

pub use asset::{Asset, AssetId};
pub use brand::{Brand, BrandId, FooterPolicy};
pub use document::{Document, DocumentDetails, DocumentId, DocumentKind};
pub use section::{
    Background, BodyText, CallToAction, Event, EventListing, Heading, Image, Section,
    SectionContent, SectionId, SectionKind, check_link,
};
pub use validation::Violation;
