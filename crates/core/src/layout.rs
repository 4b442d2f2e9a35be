//! On-disk layout of downloaded audio files.
//!
//! Single-track requests land directly under the downloads root; playlist
//! tracks go into a subfolder named after the playlist.

use std::path::{Path, PathBuf};

use crate::track::{Playlist, Track};

const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Strip filesystem-hostile characters, returning `fallback` when nothing
/// printable remains.
pub fn sanitize(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name for a track: "<artist> - <name>.<ext>".
pub fn track_file_name(track: &Track, extension: &str) -> String {
    let artist = sanitize(&track.artist, "unknown_artist");
    let name = sanitize(&track.name, "unknown_track");
    format!("{} - {}.{}", artist, name, extension)
}

/// Directory a track's file belongs in.
pub fn track_dir(root: &Path, playlist: Option<&Playlist>) -> PathBuf {
    match playlist {
        Some(p) if !p.is_track => root.join(sanitize(&p.name, "unknown_playlist")),
        _ => root.to_path_buf(),
    }
}

/// Full destination path for a track's audio file.
pub fn track_path(
    root: &Path,
    playlist: Option<&Playlist>,
    track: &Track,
    extension: &str,
) -> PathBuf {
    track_dir(root, playlist).join(track_file_name(track, extension))
}
