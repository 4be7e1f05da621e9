//! Error types for glyph-store

use std::path::PathBuf;

/// Result type for glyph-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in glyph-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File is not a JSON object of string -> string pairs
    #[error("malformed JSON at {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },

    /// A key does not match the schema of its table kind
    #[error("schema violation at {path}: key '{key}': {reason}")]
    SchemaViolation {
        path: PathBuf,
        key: String,
        reason: String,
    },

    /// Filesystem error from glyph-fs
    #[error(transparent)]
    Fs(#[from] glyph_fs::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
