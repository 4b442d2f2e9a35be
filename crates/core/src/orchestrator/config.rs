//! Orchestrator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{AudioFormat, Config};

/// Configuration for the track orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Root directory downloaded audio lands in.
    pub downloads_root: PathBuf,

    /// Target audio format.
    pub format: AudioFormat,

    /// Wall-clock limit applied to the tagging step in ms; non-positive
    /// disables. The fetch stage enforces the same limit at the subprocess
    /// level.
    pub download_timeout_ms: i64,

    /// Concurrent search workers.
    pub search_workers: usize,

    /// Concurrent download workers.
    pub download_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            downloads_root: PathBuf::from("downloads"),
            format: AudioFormat::M4a,
            download_timeout_ms: 20 * 60 * 1000,
            search_workers: 1,
            download_workers: 1,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            downloads_root: config.downloads.root.clone(),
            format: config.downloads.format,
            download_timeout_ms: config.downloads.timeout_ms,
            search_workers: config.downloads.search_workers,
            download_workers: config.downloads.download_workers,
        }
    }
}
