//! Error types for the TTS layer.

use thiserror::Error;

/// Errors that can occur while talking to the speech provider.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The request never completed (connect failure, timeout, bad TLS).
    #[error("provider transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body text, as returned by the provider.
        body: String,
    },

    /// A 2xx synthesis response carried no audio bytes.
    #[error("provider returned an empty audio body")]
    EmptyAudio,

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
