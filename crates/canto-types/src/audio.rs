//! Synthesized-audio value objects and the generation result type.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::GenerationParams;

/// Voice rendering settings sent with every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Output consistency; lower values vary more between takes.
    pub stability: f32,
    /// How closely the output tracks the original voice.
    pub similarity_boost: f32,
    /// Style exaggeration factor.
    pub style: f32,
    /// Boosts similarity to the original speaker at some latency cost.
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// One synthesized audio variant.
///
/// Instances are created per provider response and live until persisted or
/// discarded. `local_path` is a back-reference assigned once the variant is
/// written to disk; it does not own the file.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    /// Disambiguates sibling outputs of one request, `0..N-1`.
    pub variant_index: u32,
    /// Raw audio bytes, owned exclusively until persisted.
    pub bytes: Vec<u8>,
    /// MIME type reported by the provider, e.g. `audio/mpeg`.
    pub mime_type: String,
    /// The text this audio was synthesized from.
    pub source_text: String,
    /// When the provider call completed.
    pub created_at: DateTime<Utc>,
    /// Where the variant was persisted, once it has been.
    pub local_path: Option<PathBuf>,
    /// Provider parameters used for this generation.
    pub params: GenerationParams,
}

// Identity is (variant_index, bytes, mime_type, source_text); timestamps,
// path, and parameter metadata are excluded.
impl PartialEq for GeneratedAudio {
    fn eq(&self, other: &Self) -> bool {
        self.variant_index == other.variant_index
            && self.bytes == other.bytes
            && self.mime_type == other.mime_type
            && self.source_text == other.source_text
    }
}

impl Eq for GeneratedAudio {}

/// The all-or-nothing outcome of a multi-variant generation request.
///
/// Exactly one variant is populated; partial success is not representable.
#[derive(Debug)]
pub enum AudioGenerationResult {
    /// Every requested variant was generated, in `variant_index` order.
    Success(Vec<GeneratedAudio>),
    /// The batch failed; any variants already generated were discarded.
    Error {
        message: String,
        cause: Option<String>,
    },
}

impl AudioGenerationResult {
    /// Returns true for the `Success` variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the generated variants, or `None` on error.
    pub fn audios(&self) -> Option<&[GeneratedAudio]> {
        match self {
            Self::Success(audios) => Some(audios),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error message, or `None` on success.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { message, .. } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(variant_index: u32, bytes: &[u8]) -> GeneratedAudio {
        GeneratedAudio {
            variant_index,
            bytes: bytes.to_vec(),
            mime_type: "audio/mpeg".to_string(),
            source_text: "hello".to_string(),
            created_at: Utc::now(),
            local_path: None,
            params: GenerationParams::new("elevenlabs"),
        }
    }

    #[test]
    fn equality_ignores_timestamp_path_and_params() {
        let mut a = audio(0, b"bytes");
        let mut b = audio(0, b"bytes");
        b.created_at = a.created_at + chrono::Duration::seconds(90);
        b.local_path = Some(PathBuf::from("/tmp/somewhere.mp3"));
        b.params.set_str("voice_id", "other");
        a.params.set_str("voice_id", "one");

        assert_eq!(a, b);
    }

    #[test]
    fn equality_covers_identity_fields() {
        let a = audio(0, b"bytes");
        assert_ne!(a, audio(1, b"bytes"));
        assert_ne!(a, audio(0, b"other"));

        let mut c = audio(0, b"bytes");
        c.source_text = "different".to_string();
        assert_ne!(a, c);
    }

    #[test]
    fn result_accessors() {
        let ok = AudioGenerationResult::Success(vec![audio(0, b"x")]);
        assert!(ok.is_success());
        assert_eq!(ok.audios().map(<[GeneratedAudio]>::len), Some(1));
        assert_eq!(ok.error_message(), None);

        let err = AudioGenerationResult::Error {
            message: "boom".to_string(),
            cause: None,
        };
        assert!(!err.is_success());
        assert!(err.audios().is_none());
        assert_eq!(err.error_message(), Some("boom"));
    }
}
