//! Configuration management for Lectern.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config directory.
const APP_NAME: &str = "Lectern";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder values for unconfigured credentials.
const USER_PLACEHOLDER: &str = "YOUR_LOGIN_EMAIL";
const PASSWORD_PLACEHOLDER: &str = "YOUR_PASSWORD";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account credentials for the learning site.
    pub account: AccountConfig,

    /// Browser session settings.
    pub browser: BrowserConfig,

    /// Download and retry behavior.
    pub download: DownloadConfig,

    /// File paths.
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            browser: BrowserConfig::default(),
            download: DownloadConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Login email.
    pub user: String,

    /// Login password.
    pub password: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            user: USER_PLACEHOLDER.to_string(),
            password: PASSWORD_PLACEHOLDER.to_string(),
        }
    }
}

impl AccountConfig {
    /// Checks if credentials are configured (not placeholders).
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty()
            && !self.password.is_empty()
            && self.user != USER_PLACEHOLDER
            && self.password != PASSWORD_PLACEHOLDER
    }
}

/// Browser session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run the browser without a visible window.
    pub headless: bool,

    /// Viewport width in pixels.
    pub window_width: u32,

    /// Viewport height in pixels.
    pub window_height: u32,

    /// Wait after navigation for dynamic content to settle, in seconds.
    pub settle_delay_sec: f64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1600,
            window_height: 900,
            settle_delay_sec: 2.0,
        }
    }
}

/// Download and retry behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Attempts per lesson (resolve + transfer) before it is skipped.
    pub lesson_attempts: u32,

    /// Attempts to resolve a lesson's media source.
    pub resolve_attempts: u32,

    /// Pause between media resolution attempts, in seconds.
    pub resolve_retry_delay_sec: f64,

    /// Attempts to read a course's structure before skipping it.
    pub structure_attempts: u32,

    /// Pause between structure attempts, in seconds.
    pub structure_retry_delay_sec: f64,

    /// Hard bound on one transfer, in seconds.
    pub stream_timeout_sec: u64,

    /// Existing files at or below this size are treated as incomplete
    /// leftovers from an interrupted run, in bytes.
    pub min_valid_size_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            lesson_attempts: 5,
            resolve_attempts: 5,
            resolve_retry_delay_sec: 4.0,
            structure_attempts: 5,
            structure_retry_delay_sec: 2.0,
            stream_timeout_sec: 180,
            min_valid_size_bytes: 200 * 1024,
        }
    }
}

impl DownloadConfig {
    /// Retry schedule for media resolution.
    pub fn resolve_schedule(&self) -> crate::retry::RetrySchedule {
        crate::retry::RetrySchedule::new(
            self.resolve_attempts,
            Duration::from_secs_f64(self.resolve_retry_delay_sec),
        )
    }

    /// Retry schedule for structure extraction.
    pub fn structure_schedule(&self) -> crate::retry::RetrySchedule {
        crate::retry::RetrySchedule::new(
            self.structure_attempts,
            Duration::from_secs_f64(self.structure_retry_delay_sec),
        )
    }

    /// Hard bound on one transfer.
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_sec)
    }
}

/// File path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory downloaded courses are written under.
    pub output_directory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.account.is_configured() {
            return Err(ConfigError::MissingValue(
                "account.user / account.password (set your credentials in the config file)"
                    .to_string(),
            ));
        }

        if self.download.lesson_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "download.lesson_attempts".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.download.resolve_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "download.resolve_attempts".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.download.structure_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "download.structure_attempts".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.download.stream_timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                key: "download.stream_timeout_sec".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.account.is_configured());
        assert!(config.browser.headless);
        assert_eq!(config.download.lesson_attempts, 5);
        assert_eq!(config.download.min_valid_size_bytes, 200 * 1024);
        assert_eq!(config.download.stream_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_account_configured_check() {
        let mut account = AccountConfig::default();
        assert!(!account.is_configured());

        account.user = "someone@example.com".to_string();
        assert!(!account.is_configured());

        account.password = "hunter2".to_string();
        assert!(account.is_configured());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let file = NamedTempFile::new().unwrap();

        config.save_to(file.path()).unwrap();

        let loaded = Config::load_from(file.path()).unwrap();
        assert_eq!(loaded.browser.window_width, config.browser.window_width);
        assert_eq!(
            loaded.download.resolve_retry_delay_sec,
            config.download.resolve_retry_delay_sec
        );
        assert_eq!(loaded.paths.output_directory, config.paths.output_directory);
    }

    #[test]
    fn test_validation() {
        let config = Config::default();
        assert!(config.validate().is_err()); // credentials not set

        let mut config = Config::default();
        config.account.user = "someone@example.com".to_string();
        config.account.password = "hunter2".to_string();
        assert!(config.validate().is_ok());

        config.download.lesson_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schedules_come_from_config() {
        let download = DownloadConfig::default();
        let resolve = download.resolve_schedule();
        assert_eq!(resolve.attempts, 5);
        assert_eq!(resolve.delay, Duration::from_secs(4));
        let structure = download.structure_schedule();
        assert_eq!(structure.attempts, 5);
        assert_eq!(structure.delay, Duration::from_secs(2));
    }
}
