//! Tagger implementation backed by lofty.

use std::path::Path;

use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use tracing::{debug, warn};

use super::types::{CoverTagger, TagError};

/// Writes tags with lofty, fetching cover art over HTTP.
pub struct LoftyTagger {
    http: reqwest::Client,
}

impl LoftyTagger {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, TagError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TagError::CoverFetch {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TagError::CoverFetch {
                url: url.to_string(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| TagError::CoverFetch {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }
}

impl Default for LoftyTagger {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the picture mime type from magic bytes.
fn guess_mime(data: &[u8]) -> MimeType {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        MimeType::Png
    } else {
        MimeType::Jpeg
    }
}

fn write_tags(
    path: &Path,
    artist: &str,
    title: &str,
    cover: Option<Vec<u8>>,
) -> Result<(), TagError> {
    let mut tagged_file = Probe::open(path)?.read()?;

    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file.primary_tag_mut().expect("tag just inserted")
        }
    };

    tag.set_artist(artist.to_string());
    tag.set_title(title.to_string());

    if let Some(data) = cover {
        let mime = guess_mime(&data);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            None,
            data,
        ));
    }

    tagged_file.save_to_path(path, WriteOptions::default())?;
    Ok(())
}

#[async_trait]
impl CoverTagger for LoftyTagger {
    async fn tag(
        &self,
        path: &Path,
        artist: &str,
        title: &str,
        cover_url: Option<&str>,
    ) -> Result<(), TagError> {
        // A broken cover URL degrades to tags without artwork.
        let cover = match cover_url {
            Some(url) if !url.is_empty() => match self.fetch_cover(url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(%url, error = %e, "Cover art fetch failed, tagging without artwork");
                    None
                }
            },
            _ => None,
        };

        debug!(path = %path.display(), artist, title, "Writing tags");

        let path = path.to_path_buf();
        let artist = artist.to_string();
        let title = title.to_string();
        tokio::task::spawn_blocking(move || write_tags(&path, &artist, &title, cover))
            .await
            .map_err(|e| TagError::Io(std::io::Error::other(e)))?
    }
}
