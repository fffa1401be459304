//! Error types for the library layer.

use thiserror::Error;

/// Errors that can occur during library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("track not found: {0}")]
    TrackNotFound(String),

    #[error("playlist not found: {0}")]
    PlaylistNotFound(i64),
}
