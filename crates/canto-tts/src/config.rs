//! Client configuration.
//!
//! The provider endpoint and timeouts are an explicit value passed to the
//! client constructor, never process-wide state; tests point `base_url` at
//! a local server, production uses the default.

use std::time::Duration;

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default model used for synthesis requests.
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Per-call HTTP timeout. The only bound on an in-flight call; there is no
/// cancellation mechanism beyond it.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`crate::ElevenLabsClient`].
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    /// Base URL of the provider API, without a trailing slash.
    pub base_url: String,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
    /// Model used when a request does not name one.
    pub default_model_id: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: CALL_TIMEOUT,
            default_model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

impl ElevenLabsConfig {
    /// Creates a config pointing at a non-default endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
