//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Cleanup left resources behind
    #[error("Cleanup incomplete: {deletions} deletion(s) and {listings} listing(s) failed")]
    CleanupIncomplete {
        /// Resources that could not be deleted
        deletions: usize,
        /// Kinds that could not be listed
        listings: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Harness library error
    #[error("{0}")]
    Harness(#[from] console_harness::HarnessError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
