use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker counts are at least 1
/// - Downloads root is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.downloads.search_workers == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.search_workers must be at least 1".to_string(),
        ));
    }

    if config.downloads.download_workers == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.download_workers must be at least 1".to_string(),
        ));
    }

    if config.downloads.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "downloads.root cannot be empty".to_string(),
        ));
    }

    Ok(())
}
