//! Error types for ccline
//!
//! Every fallible operation in the ccline crates returns [`Result`]. Data
//! quality problems in the usage logs are not errors: the loader, aggregator
//! and cache absorb them and report "no data" instead. The variants here cover
//! environment failures and programmer errors.
//!
//! # Example
//!
//! ```
//! use ccline_core::error::{CclineError, Result};
//!
//! fn read_settings() -> Result<String> {
//!     // io::Error converts into CclineError automatically
//!     let text = std::fs::read_to_string("does-not-exist.json")?;
//!     Ok(text)
//! }
//!
//! assert!(matches!(read_settings(), Err(CclineError::Io(_))));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ccline operations
#[derive(Error, Debug)]
pub enum CclineError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The Claude data directory does not exist
    #[error("Claude data directory not found at {}", .0.display())]
    NoClaudeDirectory(PathBuf),

    /// A timestamp string could not be interpreted
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache entry could not be written
    #[error("Cache error: {0}")]
    Cache(String),

    /// An external command or request exceeded its time budget
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The budget that was exceeded
        seconds: u64,
    },

    /// An external command exited unsuccessfully
    #[error("Command `{command}` failed: {message}")]
    Subprocess {
        /// The program that was run
        command: String,
        /// Exit status or stderr summary
        message: String,
    },
}

/// Convenience type alias for Results in ccline
pub type Result<T> = std::result::Result<T, CclineError>;
