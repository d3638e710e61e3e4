//! Text side of the lyric generator: reference catalogs, variant identities,
//! live structural rendering of model output and field extraction.

pub mod catalog;
pub mod extract;
pub mod render;
mod variant;

pub use catalog::{Archetype, Category, Rhythm};
pub use extract::{extract_fields, ActionAvailability, ExtractedFields};
pub use render::{render, word_topic, BodyPart, RenderedView, Section, TagKind, TaggedToken, WordToken, SECTION_DELIMITER};
pub use variant::Variant;
