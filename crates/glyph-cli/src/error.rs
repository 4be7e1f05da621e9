//! Error types for the CLI

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced to the user at the top level
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A user-facing message with no underlying cause
    #[error("{0}")]
    User(String),

    /// Error from the synchronization engine
    #[error(transparent)]
    Sync(#[from] glyph_sync::Error),
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        CliError::User(message.into())
    }
}
