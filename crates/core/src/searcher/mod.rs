//! Source resolution stage: finds a watch URL for a track.

mod types;
mod ytdlp;

pub use types::{SearchError, TrackSearcher};
pub use ytdlp::YtDlpSearcher;
