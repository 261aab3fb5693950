//! Error types for the core library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session or protocol failure (connect, login, select, fetch).
    #[error("IMAP error: {0}")]
    Imap(#[from] mailwait_imap::Error),

    /// No message matched before the deadline.
    #[error("Can't find the specific email within {0:?}")]
    Timeout(Duration),

    /// Writing an attachment to disk failed.
    #[error("Failed to save attachment {}: {source}", path.display())]
    Attachment {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Subject or body filter is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Unknown or malformed wait option.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
