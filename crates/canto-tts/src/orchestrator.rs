//! Multi-variant generation orchestration.
//!
//! Drives N independent synthesis calls per request, strictly one at a
//! time: each call suspends the flow until its response arrives, a short
//! pause separates successive calls to stay under the provider's rate
//! limit, and `variant_index` is assigned in call order. Variant calls
//! share no seed and do not chain request ids into each other — request-id
//! continuity exists for multi-segment narration, and seeding would
//! collapse the variants into identical takes.
//!
//! The batch is all-or-nothing: the first failed variant discards the
//! whole batch. Quota bookkeeping after a successful batch is best-effort
//! and never affects the returned result.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use canto_db::DbPool;
use canto_keys::ApiKey;
use canto_types::{AudioGenerationResult, GeneratedAudio, GenerationParams, VoiceSettings};

use crate::client::SynthesisRequest;
use crate::config::DEFAULT_MODEL_ID;
use crate::error::TtsError;
use crate::provider::TtsProvider;

/// Number of variants generated when the caller does not say otherwise.
pub const DEFAULT_VARIANT_COUNT: u32 = 3;

/// Returned when generation is attempted with no active credential.
pub const NO_ACTIVE_KEY_MESSAGE: &str =
    "No active API key configured. Please configure ElevenLabs API key in Settings.";

/// Pause between successive variant calls.
const VARIANT_DELAY: Duration = Duration::from_millis(500);

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Text to render.
    pub text: String,
    /// Explicit voice; falls back to the active key's default voice.
    pub voice_id: Option<String>,
    /// Display name of the voice, carried into the parameter bag for
    /// file naming.
    pub voice_name: Option<String>,
    /// How many independent variants to generate.
    pub variant_count: u32,
    /// Request ids of preceding narrative segments, passed through
    /// unchanged to every variant call.
    pub previous_request_ids: Vec<String>,
    /// Voice rendering settings.
    pub settings: VoiceSettings,
    /// Provider model identifier.
    pub model_id: String,
    /// Deterministic seed for narrative regeneration. Not set for variant
    /// diversity.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    /// A request with default settings and variant count.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            voice_name: None,
            variant_count: DEFAULT_VARIANT_COUNT,
            previous_request_ids: Vec::new(),
            settings: VoiceSettings::default(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            seed: None,
        }
    }
}

/// The generation orchestrator.
pub struct Generator<P> {
    provider: P,
    pool: DbPool,
    variant_delay: Duration,
}

impl<P: TtsProvider> Generator<P> {
    /// Creates an orchestrator over the given provider and key store.
    pub fn new(provider: P, pool: DbPool) -> Self {
        Self {
            provider,
            pool,
            variant_delay: VARIANT_DELAY,
        }
    }

    /// Overrides the inter-variant pause. Tests set this to zero.
    pub fn with_variant_delay(mut self, delay: Duration) -> Self {
        self.variant_delay = delay;
        self
    }

    /// Generates `request.variant_count` independent renderings of
    /// `request.text`.
    ///
    /// Configuration problems (no active key, no resolvable voice) and
    /// provider failures are returned as the `Error` variant; this method
    /// does not panic and does not return partial batches.
    pub async fn generate(&self, request: &GenerationRequest) -> AudioGenerationResult {
        let key = match self.load_active_key().await {
            Ok(Some(key)) => key,
            Ok(None) => {
                tracing::warn!("generation requested with no active api key");
                return AudioGenerationResult::Error {
                    message: NO_ACTIVE_KEY_MESSAGE.to_string(),
                    cause: None,
                };
            }
            Err(cause) => {
                return AudioGenerationResult::Error {
                    message: "Failed to load the active API key.".to_string(),
                    cause: Some(cause),
                };
            }
        };

        // Explicit parameter wins over the credential's stored default.
        let Some(voice_id) = request
            .voice_id
            .clone()
            .or_else(|| key.default_voice_id.clone())
        else {
            return AudioGenerationResult::Error {
                message: "No voice selected and the active API key has no default voice."
                    .to_string(),
                cause: None,
            };
        };

        let synthesis = SynthesisRequest {
            text: request.text.clone(),
            model_id: request.model_id.clone(),
            voice_settings: request.settings,
            previous_request_ids: request.previous_request_ids.clone(),
            seed: request.seed,
        };

        let mut audios: Vec<GeneratedAudio> = Vec::with_capacity(request.variant_count as usize);

        for variant_index in 0..request.variant_count {
            if variant_index > 0 {
                sleep(self.variant_delay).await;
            }

            match self
                .provider
                .synthesize(&key.api_key, &voice_id, &synthesis)
                .await
            {
                Ok(audio) => {
                    tracing::info!(variant_index, bytes = audio.bytes.len(), "variant generated");
                    let params = GenerationParams::eleven_labs(
                        &voice_id,
                        request.voice_name.as_deref(),
                        &request.model_id,
                        &request.settings,
                        audio.request_id.as_deref(),
                    );
                    audios.push(GeneratedAudio {
                        variant_index,
                        bytes: audio.bytes,
                        mime_type: audio.mime_type,
                        source_text: request.text.clone(),
                        created_at: Utc::now(),
                        local_path: None,
                        params,
                    });
                }
                Err(e) => {
                    tracing::warn!(variant_index, error = %e, "variant failed, discarding batch");
                    return match e {
                        TtsError::Api { status, body } => AudioGenerationResult::Error {
                            message: format!("Speech generation failed with HTTP {status}: {body}"),
                            cause: None,
                        },
                        other => AudioGenerationResult::Error {
                            message: "Speech generation failed.".to_string(),
                            cause: Some(other.to_string()),
                        },
                    };
                }
            }
        }

        self.finish_batch_bookkeeping(&key).await;

        AudioGenerationResult::Success(audios)
    }

    async fn load_active_key(&self) -> Result<Option<ApiKey>, String> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| e.to_string())?;
            canto_keys::active_key(&conn).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    /// Stamps `last_used` and refreshes quota counters after a successful
    /// batch. Failures here are logged and swallowed; they never fail the
    /// generation they follow.
    async fn finish_batch_bookkeeping(&self, key: &ApiKey) {
        let pool = self.pool.clone();
        let key_id = key.id;
        let stamped = tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| e.to_string())?;
            canto_keys::touch_last_used(&conn, key_id).map_err(|e| e.to_string())
        })
        .await;
        match stamped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(key_id, error = %e, "failed to stamp last_used"),
            Err(e) => tracing::warn!(key_id, error = %e, "last_used task failed"),
        }

        match self.provider.subscription(&key.api_key).await {
            Ok(sub) => {
                let pool = self.pool.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let conn = pool.get().map_err(|e| e.to_string())?;
                    canto_keys::update_quota(
                        &conn,
                        key_id,
                        sub.character_count,
                        sub.character_limit,
                        sub.next_character_count_reset_unix,
                    )
                    .map_err(|e| e.to_string())
                })
                .await;
                match result {
                    Ok(Ok(())) => {
                        tracing::debug!(
                            key_id,
                            character_count = sub.character_count,
                            character_limit = sub.character_limit,
                            "quota counters refreshed"
                        );
                    }
                    Ok(Err(e)) => tracing::warn!(key_id, error = %e, "failed to persist quota"),
                    Err(e) => tracing::warn!(key_id, error = %e, "quota update task failed"),
                }
            }
            Err(e) => {
                tracing::warn!(key_id, error = %e, "quota refresh failed, keeping stale counters");
            }
        }
    }
}
