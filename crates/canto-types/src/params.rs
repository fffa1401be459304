//! Provider-tagged generation parameter bag.
//!
//! Generation parameters travel with each synthesized variant and are
//! persisted inside the audio file's tag namespace as JSON. The bag is
//! deliberately schemaless beyond its provider discriminator so that new
//! provider settings round-trip without a schema migration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::audio::VoiceSettings;

/// A provider-tagged bag of generation parameters.
///
/// Serialized form (the persisted `generation parameters` tag field):
///
/// ```json
/// {"type": "elevenlabs", "typeParams": {"voice_id": "...", "stability": 0.5}}
/// ```
///
/// Values round-trip lossless through JSON for every value type used
/// (string, float, bool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Provider discriminator, e.g. `"elevenlabs"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Provider-specific key/value parameters.
    #[serde(rename = "typeParams", default)]
    pub params: Map<String, Value>,
}

impl GenerationParams {
    /// The discriminator used for ElevenLabs generations.
    pub const ELEVEN_LABS: &'static str = "elevenlabs";

    /// Creates an empty bag for the given provider.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Builds the parameter bag for an ElevenLabs generation.
    ///
    /// Populates the well-known keys consumed by the persistence layer:
    /// `voice_id`, `voice_name`, `model_id`, the four voice settings, and
    /// the provider-assigned `request_id` (kept for later regeneration).
    pub fn eleven_labs(
        voice_id: &str,
        voice_name: Option<&str>,
        model_id: &str,
        settings: &VoiceSettings,
        request_id: Option<&str>,
    ) -> Self {
        let mut bag = Self::new(Self::ELEVEN_LABS);
        bag.set_str("voice_id", voice_id);
        if let Some(name) = voice_name {
            bag.set_str("voice_name", name);
        }
        bag.set_str("model_id", model_id);
        bag.set_f64("stability", f64::from(settings.stability));
        bag.set_f64("similarity_boost", f64::from(settings.similarity_boost));
        bag.set_f64("style", f64::from(settings.style));
        bag.set_bool("use_speaker_boost", settings.use_speaker_boost);
        if let Some(id) = request_id {
            bag.set_str("request_id", id);
        }
        bag
    }

    /// Returns a string parameter, or `None` if absent or not a string.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Returns a float parameter, or `None` if absent or not a number.
    pub fn f64_param(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    /// Returns a bool parameter, or `None` if absent or not a bool.
    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }

    /// Sets a string parameter, replacing any previous value.
    pub fn set_str(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), Value::from(value));
    }

    /// Sets a float parameter, replacing any previous value.
    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.params.insert(key.to_string(), Value::from(value));
    }

    /// Sets a bool parameter, replacing any previous value.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.params.insert(key.to_string(), Value::from(value));
    }
}
