use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("spooty.db")
}

/// Download pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Root directory downloaded audio lands in.
    #[serde(default = "default_downloads_root")]
    pub root: PathBuf,
    /// Target audio container/codec.
    #[serde(default)]
    pub format: AudioFormat,
    /// Per-download wall-clock limit in ms; non-positive disables the limit.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// Concurrent search workers.
    #[serde(default = "default_workers")]
    pub search_workers: usize,
    /// Concurrent download workers.
    #[serde(default = "default_workers")]
    pub download_workers: usize,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            root: default_downloads_root(),
            format: AudioFormat::default(),
            timeout_ms: default_timeout_ms(),
            search_workers: default_workers(),
            download_workers: default_workers(),
        }
    }
}

fn default_downloads_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_timeout_ms() -> i64 {
    20 * 60 * 1000
}

fn default_workers() -> usize {
    1
}

/// Supported output audio formats (yt-dlp --audio-format values).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    M4a,
    Mp3,
    Opus,
    Flac,
}

impl AudioFormat {
    /// File extension, which doubles as the yt-dlp format name.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Flac => "flac",
        }
    }
}

/// YouTube tooling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YoutubeConfig {
    /// Path or name of the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,
    /// Inline Netscape-format cookie content; wins over cookies_file.
    #[serde(default)]
    pub cookies: Option<String>,
    /// Path to an existing cookie file.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            cookies: None,
            cookies_file: None,
        }
    }
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub downloads: DownloadsConfig,
    pub youtube: SanitizedYoutubeConfig,
}

/// Sanitized YouTube config (cookie content hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedYoutubeConfig {
    pub ytdlp_path: PathBuf,
    pub cookies_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            downloads: config.downloads.clone(),
            youtube: SanitizedYoutubeConfig {
                ytdlp_path: config.youtube.ytdlp_path.clone(),
                cookies_configured: config.youtube.cookies.is_some()
                    || config.youtube.cookies_file.is_some(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, PathBuf::from("spooty.db"));
        assert_eq!(config.downloads.format, AudioFormat::M4a);
        assert_eq!(config.downloads.timeout_ms, 1_200_000);
        assert_eq!(config.downloads.search_workers, 1);
        assert_eq!(config.youtube.ytdlp_path, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_audio_format_extension() {
        assert_eq!(AudioFormat::M4a.extension(), "m4a");
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Opus.extension(), "opus");
        assert_eq!(AudioFormat::Flac.extension(), "flac");
    }

    #[test]
    fn test_sanitized_config_hides_cookies() {
        let mut config = Config::default();
        config.youtube.cookies = Some("secret-session-cookie".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.youtube.cookies_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-session-cookie"));
    }
}
