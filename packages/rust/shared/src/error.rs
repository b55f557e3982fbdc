//! Error types for regcorpus.
//!
//! Library crates use [`RegcorpusError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all regcorpus operations.
#[derive(Debug, thiserror::Error)]
pub enum RegcorpusError {
    /// Configuration or manifest loading/validation error. Fatal to a run:
    /// without a readable manifest no entries can be processed.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during document acquisition.
    #[error("network error: {0}")]
    Network(String),

    /// The redirect bound was exceeded while following a document URL.
    #[error("too many redirects fetching {url}")]
    TooManyRedirects { url: String },

    /// A fetched payload failed the PDF validation check
    /// (wrong mime, undersized, or bad signature bytes).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A downloaded PDF could not be opened or read.
    #[error("extraction error for document {identifier}: {message}")]
    Extraction { identifier: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RegcorpusError>;

impl RegcorpusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction error tagged with the document identifier.
    pub fn extraction(identifier: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            identifier: identifier.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
