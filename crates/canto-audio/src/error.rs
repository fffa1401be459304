//! Error types for audio persistence and tagging.

use thiserror::Error;

/// Errors that can occur in the tag codec.
#[derive(Debug, Error)]
pub enum TagError {
    /// Reading or writing the file failed.
    #[error("tag io error: {0}")]
    Io(#[from] std::io::Error),

    /// The ID3 layer rejected the tag.
    #[error("id3 error: {0}")]
    Id3(#[from] id3::Error),
}

/// Errors that can occur in the persistence repository.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A filesystem operation failed.
    #[error("audio io error: {0}")]
    Io(#[from] std::io::Error),
}
