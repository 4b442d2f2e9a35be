//! Cookie handling for yt-dlp invocations.
//!
//! yt-dlp only accepts cookies as a Netscape-format file. Cookies supplied
//! inline (env var or config value) are materialized to a temp file once per
//! process and reused for every invocation.

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

/// Where cookies come from.
#[derive(Debug, Clone)]
pub enum CookieSource {
    /// Raw cookie file content, to be written to a temp file.
    Inline(String),
    /// Path to an existing cookie file.
    File(PathBuf),
}

/// Resolves the `--cookies` argument for yt-dlp, if any.
pub struct Cookies {
    source: Option<CookieSource>,
    inline_path: OnceLock<PathBuf>,
}

impl Cookies {
    pub fn new(source: Option<CookieSource>) -> Self {
        Self {
            source,
            inline_path: OnceLock::new(),
        }
    }

    /// Build from config values; inline content wins over a file path.
    pub fn from_config(inline: Option<String>, file: Option<PathBuf>) -> Self {
        let source = match (inline, file) {
            (Some(content), _) if !content.trim().is_empty() => {
                Some(CookieSource::Inline(content))
            }
            (_, Some(path)) => Some(CookieSource::File(path)),
            _ => None,
        };
        Self::new(source)
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Returns the cookie file path to pass to yt-dlp, materializing inline
    /// content on first use.
    pub fn file_path(&self) -> io::Result<Option<PathBuf>> {
        match &self.source {
            None => Ok(None),
            Some(CookieSource::File(path)) => Ok(Some(path.clone())),
            Some(CookieSource::Inline(content)) => {
                if let Some(path) = self.inline_path.get() {
                    return Ok(Some(path.clone()));
                }
                let path = std::env::temp_dir().join("spooty-cookies.txt");
                std::fs::write(&path, content)?;
                debug!(path = %path.display(), "Materialized inline cookies");
                // A concurrent first use wrote the same content; either path
                // value is correct.
                let _ = self.inline_path.set(path.clone());
                Ok(Some(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_source() {
        let cookies = Cookies::from_config(None, None);
        assert!(!cookies.is_configured());
        assert!(cookies.file_path().unwrap().is_none());
    }

    #[test]
    fn test_file_source_passes_through() {
        let cookies = Cookies::from_config(None, Some(PathBuf::from("/etc/cookies.txt")));
        assert_eq!(
            cookies.file_path().unwrap(),
            Some(PathBuf::from("/etc/cookies.txt"))
        );
    }

    #[test]
    fn test_inline_wins_over_file() {
        let cookies = Cookies::from_config(
            Some("# Netscape HTTP Cookie File\n".to_string()),
            Some(PathBuf::from("/etc/cookies.txt")),
        );
        let path = cookies.file_path().unwrap().unwrap();
        assert_ne!(path, PathBuf::from("/etc/cookies.txt"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Netscape HTTP Cookie File\n"
        );
        // Second call reuses the same file.
        assert_eq!(cookies.file_path().unwrap().unwrap(), path);
    }

    #[test]
    fn test_blank_inline_is_ignored() {
        let cookies = Cookies::from_config(Some("   ".to_string()), None);
        assert!(!cookies.is_configured());
    }
}
