//! Post-download tagging: title, artist, and cover art.

mod lofty_tagger;
mod types;

pub use lofty_tagger::LoftyTagger;
pub use types::{CoverTagger, TagError};
