//! Error types for mirror redirection.

use thiserror::Error;

/// Errors that can occur while resolving a download redirect.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Requested path failed the character or length constraint.
    #[error("Invalid file name: {0}")]
    InvalidPath(String),

    /// Recognized artifact with no matching catalog row.
    #[error("{0}")]
    NotFound(String),

    /// No mirror is fresh and secure enough, even ignoring the client country.
    #[error("File was not found")]
    NoMirrorAvailable,

    /// Catalog query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            MirrorError::NotFound("ISO image was not found".to_string()).to_string(),
            "ISO image was not found"
        );
        assert_eq!(
            MirrorError::NoMirrorAvailable.to_string(),
            "File was not found"
        );
    }
}
