//! Error types for glyph-sync

use std::path::PathBuf;

/// Result type for glyph-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in glyph-sync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A domain was selected that no mapping file or config knows about
    #[error("unknown domain '{domain}'")]
    UnknownDomain { domain: String },

    /// A domain config fails its own consistency checks
    #[error("invalid config for domain '{domain}': {reason}")]
    InvalidDomainConfig { domain: String, reason: String },

    /// A table still fails validation after cleaning; nothing is written
    #[error("validation failed for domain '{domain}': {message}")]
    ValidationFailed { domain: String, message: String },

    /// A domain config file could not be parsed
    #[error("failed to parse domain config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Store error from glyph-store
    #[error(transparent)]
    Store(#[from] glyph_store::Error),

    /// Filesystem error from glyph-fs
    #[error(transparent)]
    Fs(#[from] glyph_fs::Error),

    /// HTTP client construction error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
