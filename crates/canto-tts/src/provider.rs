//! The provider seam between the orchestrator and the HTTP client.

use async_trait::async_trait;

use crate::client::{ElevenLabsClient, Subscription, SynthesisRequest, SynthesizedAudio};
use crate::error::TtsError;

/// The subset of provider operations the orchestrator drives.
///
/// Implemented by [`ElevenLabsClient`] in production and by scripted mocks
/// in tests. Implementations perform a single attempt per call.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Renders text with the given voice.
    async fn synthesize(
        &self,
        api_key: &str,
        voice_id: &str,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, TtsError>;

    /// Fetches the credential's quota state.
    async fn subscription(&self, api_key: &str) -> Result<Subscription, TtsError>;
}

#[async_trait]
impl TtsProvider for ElevenLabsClient {
    async fn synthesize(
        &self,
        api_key: &str,
        voice_id: &str,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, TtsError> {
        ElevenLabsClient::synthesize(self, api_key, voice_id, request).await
    }

    async fn subscription(&self, api_key: &str) -> Result<Subscription, TtsError> {
        ElevenLabsClient::subscription(self, api_key).await
    }
}
