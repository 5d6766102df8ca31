//! Runtime configuration for the image pipeline.
//!
//! This module provides configuration options for the preprocessing
//! pipeline, including the image store and staging locations, cache policy
//! defaults, worker concurrency, and the optional Redis endpoint.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for the preprocessing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Storage settings
    /// Root directory of the image store. Every selection path must resolve
    /// beneath this directory.
    pub image_dir: PathBuf,
    /// Directory under which per-run staging directories are created.
    pub staging_root: PathBuf,

    // Cache settings
    /// Expiry applied to cached results when the selection carries none.
    pub default_cache_ttl: Duration,
    /// Autodownload flag echoed in terminal records when the selection
    /// carries none.
    pub default_autodownload: bool,

    // Execution settings
    /// Maximum number of pipeline runs executing concurrently.
    pub max_concurrent_runs: usize,

    // Backend settings
    /// Redis endpoint for the result cache. When absent the service falls
    /// back to the in-process cache.
    pub redis_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // Storage defaults
            image_dir: PathBuf::from("/home/app/images"),
            staging_root: std::env::temp_dir(),

            // Cache defaults
            default_cache_ttl: Duration::from_secs(86_400), // 24 hours
            default_autodownload: true,

            // Execution defaults
            max_concurrent_runs: 4,

            // Backend defaults
            redis_url: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `IMAGE_DIR`: Root of the image store (default: /home/app/images)
    /// - `STAGING_DIR`: Staging directory root (default: system temp dir)
    /// - `CACHE_DURATION`: Result expiry in seconds (default: 86400)
    /// - `AUTODOWNLOAD_FILE`: Default autodownload flag (default: true)
    /// - `MAX_CONCURRENT_RUNS`: Concurrent run limit (default: 4)
    /// - `REDIS_URL`: Redis endpoint for the result cache (optional)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Storage settings
        if let Ok(val) = std::env::var("IMAGE_DIR") {
            config.image_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("STAGING_DIR") {
            config.staging_root = PathBuf::from(val);
        }

        // Cache settings
        if let Ok(val) = std::env::var("CACHE_DURATION") {
            let secs: u64 = parse_env_value(&val, "CACHE_DURATION")?;
            config.default_cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("AUTODOWNLOAD_FILE") {
            config.default_autodownload = parse_env_bool(&val, "AUTODOWNLOAD_FILE")?;
        }

        // Execution settings
        if let Ok(val) = std::env::var("MAX_CONCURRENT_RUNS") {
            config.max_concurrent_runs = parse_env_value(&val, "MAX_CONCURRENT_RUNS")?;
        }

        // Backend settings
        if let Ok(val) = std::env::var("REDIS_URL") {
            config.redis_url = Some(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "image_dir cannot be empty".to_string(),
            ));
        }

        if self.staging_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "staging_root cannot be empty".to_string(),
            ));
        }

        if self.default_cache_ttl.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "default_cache_ttl must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_runs == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_runs must be greater than 0".to_string(),
            ));
        }

        if let Some(url) = &self.redis_url {
            if url.is_empty() {
                return Err(ConfigError::Invalid(
                    "redis_url cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Builder method to set the image store root.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// Builder method to set the staging root.
    pub fn with_staging_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_root = dir.into();
        self
    }

    /// Builder method to set the default cache expiry.
    pub fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl = ttl;
        self
    }

    /// Builder method to set the default autodownload flag.
    pub fn with_default_autodownload(mut self, autodownload: bool) -> Self {
        self.default_autodownload = autodownload;
        self
    }

    /// Builder method to set the concurrent run limit.
    pub fn with_max_concurrent_runs(mut self, max: usize) -> Self {
        self.max_concurrent_runs = max;
        self
    }

    /// Builder method to set the Redis endpoint.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.image_dir, PathBuf::from("/home/app/images"));
        assert_eq!(config.staging_root, std::env::temp_dir());
        assert_eq!(config.default_cache_ttl, Duration::from_secs(86_400));
        assert!(config.default_autodownload);
        assert_eq!(config.max_concurrent_runs, 4);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_image_dir("/srv/images")
            .with_staging_root("/srv/staging")
            .with_default_cache_ttl(Duration::from_secs(600))
            .with_default_autodownload(false)
            .with_max_concurrent_runs(8)
            .with_redis_url("redis://127.0.0.1:6379");

        assert_eq!(config.image_dir, PathBuf::from("/srv/images"));
        assert_eq!(config.staging_root, PathBuf::from("/srv/staging"));
        assert_eq!(config.default_cache_ttl, Duration::from_secs(600));
        assert!(!config.default_autodownload);
        assert_eq!(config.max_concurrent_runs, 8);
        assert_eq!(
            config.redis_url.as_deref(),
            Some("redis://127.0.0.1:6379")
        );
    }

    #[test]
    fn test_validation_valid_config() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_image_dir() {
        let config = PipelineConfig::default().with_image_dir("");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("image_dir"));
    }

    #[test]
    fn test_validation_zero_ttl() {
        let config = PipelineConfig::default().with_default_cache_ttl(Duration::from_secs(0));
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("default_cache_ttl"));
    }

    #[test]
    fn test_validation_zero_concurrent_runs() {
        let config = PipelineConfig::default().with_max_concurrent_runs(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("max_concurrent_runs"));
    }

    #[test]
    fn test_validation_empty_redis_url() {
        let config = PipelineConfig::default().with_redis_url("");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("redis_url"));
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("true", "test").unwrap());
        assert!(parse_env_bool("1", "test").unwrap());
        assert!(parse_env_bool("yes", "test").unwrap());
        assert!(parse_env_bool("on", "test").unwrap());
        assert!(parse_env_bool("TRUE", "test").unwrap());

        assert!(!parse_env_bool("false", "test").unwrap());
        assert!(!parse_env_bool("0", "test").unwrap());
        assert!(!parse_env_bool("no", "test").unwrap());
        assert!(!parse_env_bool("off", "test").unwrap());

        assert!(parse_env_bool("invalid", "test").is_err());
    }

    #[test]
    fn test_parse_env_value_error_names_key() {
        let result: Result<u64, _> = parse_env_value("not-a-number", "CACHE_DURATION");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("CACHE_DURATION"));
        assert!(err.to_string().contains("not-a-number"));
    }
}
