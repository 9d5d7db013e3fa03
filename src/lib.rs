//! Lectern - LinkedIn Learning course downloader.
//!
//! This library provides functionality for:
//! - Classifying course, learning path, collection, and personal-list references
//! - Extracting a course's chapter/lesson structure from its classroom page
//! - Downloading lesson videos with bounded retries and resume-by-presence

pub mod automation;
pub mod config;
pub mod console;
pub mod download;
pub mod enumerate;
pub mod error;
pub mod pipeline;
pub mod references;
pub mod retry;
pub mod sanitize;
pub mod structure;

// Re-export commonly used types
pub use automation::{ChromeSession, PageAutomation};
pub use config::Config;
pub use console::Console;
pub use error::{AutomationError, ConfigError, DownloadError, StructureError};
pub use pipeline::{Pipeline, RunReport};
pub use references::{RequestedContent, classify};
pub use structure::{Chapter, CourseStructure, Lesson};
