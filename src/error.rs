//! Error types for the Lectern application.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the page automation session.
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Browser could not be launched
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Page navigation failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The required element isn't present on the page
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Reading text or an attribute from the page failed
    #[error("Failed to read from page: {0}")]
    Read(String),

    /// In-page script evaluation failed
    #[error("Script evaluation failed: {0}")]
    Evaluate(String),

    /// The browser session itself is gone; the run cannot continue
    #[error("Browser session lost: {0}")]
    SessionLost(String),
}

/// Error type for course structure extraction.
///
/// Extraction never distinguishes partial failures: anything that
/// prevents reading the full chapter tree reports `Unavailable`, and
/// the orchestrator decides whether to retry. Losing the session
/// itself stays distinct, since it ends the whole run.
#[derive(Error, Debug)]
pub enum StructureError {
    /// The course page could not be parsed into a chapter tree
    #[error("Course structure unavailable: {0}")]
    Unavailable(String),

    /// The browser session is gone; the run cannot continue
    #[error(transparent)]
    Session(AutomationError),
}

impl From<AutomationError> for StructureError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::SessionLost(_) => StructureError::Session(err),
            other => StructureError::Unavailable(other.to_string()),
        }
    }
}

/// Error type for media resolution and transfer.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// No media source materialized after exhausting retries
    #[error("No media source found after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// The transfer did not complete within the allotted time
    #[error("Transfer timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request or stream failed
    #[error("Transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    /// Writing the destination file failed
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),

    /// The browser session is gone; the run cannot continue
    #[error(transparent)]
    Session(AutomationError),
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
