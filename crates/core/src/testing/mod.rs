//! Testing utilities and mock implementations.
//!
//! Mock implementations of the pipeline's external service traits, allowing
//! end-to-end orchestrator tests without yt-dlp, the network, or real audio
//! files.

mod memory_store;
mod mock_fetcher;
mod mock_searcher;
mod mock_tagger;

pub use memory_store::MemoryTrackStore;
pub use mock_fetcher::MockFetcher;
pub use mock_searcher::MockSearcher;
pub use mock_tagger::{MockTagger, TagCall};
