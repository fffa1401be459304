//! ElevenLabs protocol client.
//!
//! A stateless wrapper over the provider HTTP API: text-to-speech synthesis,
//! voice listing, subscription (quota) lookup, and generation history. Every
//! call takes the API key as an argument — credentials live in the key
//! store, not in the client — and performs exactly one attempt.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use canto_types::VoiceSettings;

use crate::config::ElevenLabsConfig;
use crate::error::TtsError;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "xi-api-key";

/// Headers the provider may use for the request identifier, checked in
/// order. Header-name matching is case-insensitive.
const REQUEST_ID_HEADERS: [&str; 2] = ["request-id", "xi-request-id"];

/// Maximum history page size accepted by the provider.
const MAX_HISTORY_PAGE_SIZE: u32 = 1000;

/// Body of a synthesis call.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    /// Text to render.
    pub text: String,
    /// Provider model identifier.
    pub model_id: String,
    /// Voice rendering settings.
    pub voice_settings: VoiceSettings,
    /// Request ids of preceding narrative segments, for prosody continuity.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previous_request_ids: Vec<String>,
    /// Deterministic sampling seed. Left unset for variant generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A successful synthesis response.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Raw audio bytes.
    pub bytes: Vec<u8>,
    /// MIME type from the response, `audio/mpeg` when unspecified.
    pub mime_type: String,
    /// Provider-assigned request identifier, when reported.
    pub request_id: Option<String>,
}

/// One available voice.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<Voice>,
}

/// Character quota state for a credential.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    /// Characters consumed in the current window.
    #[serde(default)]
    pub character_count: i64,
    /// Character allowance for the current window.
    #[serde(default)]
    pub character_limit: i64,
    /// Unix time of the next counter reset.
    #[serde(default)]
    pub next_character_count_reset_unix: i64,
}

/// Filters for a history lookup.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Page size; clamped to the provider maximum of 1000.
    pub page_size: Option<u32>,
    /// Cursor: return items after this history item id.
    pub start_after_history_item_id: Option<String>,
    /// Restrict to one voice.
    pub voice_id: Option<String>,
    /// Only items generated at or after this unix time.
    pub date_after_unix: Option<i64>,
    /// Only items generated at or before this unix time.
    pub date_before_unix: Option<i64>,
}

/// One generation recorded in the provider's history.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub history_item_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub voice_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date_unix: i64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// One page of history results.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoryPage {
    #[serde(default)]
    pub history: Vec<HistoryItem>,
    /// Cursor for the next page.
    #[serde(default)]
    pub last_history_item_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// The ElevenLabs HTTP client.
#[derive(Debug)]
pub struct ElevenLabsClient {
    config: ElevenLabsConfig,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    /// Builds a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `TtsError::Http` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ElevenLabsConfig) -> Result<Self, TtsError> {
        if config.base_url.trim().is_empty() {
            return Err(TtsError::InvalidConfig("base_url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// The configured default model identifier.
    pub fn default_model_id(&self) -> &str {
        &self.config.default_model_id
    }

    /// Renders `request.text` with the given voice.
    ///
    /// Returns the raw audio plus the provider-assigned request id, or a
    /// structured failure carrying the HTTP status and response body.
    pub async fn synthesize(
        &self,
        api_key: &str,
        voice_id: &str,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, TtsError> {
        let url = format!("{}/v1/text-to-speech/{}", self.config.base_url, voice_id);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let request_id = request_id_from_headers(response.headers());
        let mime_type = mime_type_from_headers(response.headers());

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        tracing::debug!(
            voice_id,
            bytes = bytes.len(),
            request_id = request_id.as_deref().unwrap_or("<none>"),
            "synthesis call complete"
        );

        Ok(SynthesizedAudio {
            bytes,
            mime_type,
            request_id,
        })
    }

    /// Lists the voices available to the given credential.
    pub async fn list_voices(&self, api_key: &str) -> Result<Vec<Voice>, TtsError> {
        let url = format!("{}/v1/voices", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let voices: VoicesResponse = response.json().await?;
        Ok(voices.voices)
    }

    /// Fetches the credential's character quota state.
    pub async fn subscription(&self, api_key: &str) -> Result<Subscription, TtsError> {
        let url = format!("{}/v1/user/subscription", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        Ok(response.json().await?)
    }

    /// Fetches one page of the credential's generation history.
    pub async fn history(
        &self,
        api_key: &str,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, TtsError> {
        let url = format!("{}/v1/history", self.config.base_url);

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(page_size) = query.page_size {
            params.push(("page_size", page_size.clamp(1, MAX_HISTORY_PAGE_SIZE).to_string()));
        }
        if let Some(ref cursor) = query.start_after_history_item_id {
            params.push(("start_after_history_item_id", cursor.clone()));
        }
        if let Some(ref voice_id) = query.voice_id {
            params.push(("voice_id", voice_id.clone()));
        }
        if let Some(after) = query.date_after_unix {
            params.push(("date_after_unix", after.to_string()));
        }
        if let Some(before) = query.date_before_unix {
            params.push(("date_before_unix", before.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .query(&params)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        Ok(response.json().await?)
    }

    /// Downloads the audio of a past generation.
    pub async fn history_audio(
        &self,
        api_key: &str,
        history_item_id: &str,
    ) -> Result<Vec<u8>, TtsError> {
        let url = format!(
            "{}/v1/history/{}/audio",
            self.config.base_url, history_item_id
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }
        Ok(bytes)
    }
}

/// Maps a non-2xx response to `TtsError::Api`, consuming the body as text.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, TtsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TtsError::Api {
        status: status.as_u16(),
        body,
    })
}

fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

fn mime_type_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .unwrap_or_else(|| "audio/mpeg".to_string())
}
