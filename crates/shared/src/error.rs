//! Error types for lessonforge.
//!
//! Library crates use [`LessonForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lessonforge operations.
#[derive(Debug, thiserror::Error)]
pub enum LessonForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Catalog file could not be read or parsed.
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// A page failed to load after the retry budget was exhausted.
    /// The only error that leaves the progress ledger untouched.
    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    /// The expected content region was absent from a page.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// A markup or math subtree failed to transcribe or embed.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// An image or direct-download asset failed to retrieve.
    #[error("asset fetch error: {0}")]
    AssetFetch(String),

    /// Progress ledger read/append error.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LessonForgeError>;

impl LessonForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a catalog error from any displayable message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog {
            message: msg.into(),
        }
    }

    /// Create a navigation error for a URL.
    pub fn navigation(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
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
