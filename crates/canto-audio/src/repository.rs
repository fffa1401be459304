//! Persistence repository for generated audio.
//!
//! Freshly generated variants land in a dedicated temp directory under
//! deterministic names composed from the generation timestamp, voice, and
//! rendering settings. Collisions are avoided by second-granular timestamps
//! plus variant-specific content, not by retry-on-collision.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use canto_types::{GeneratedAudio, GenerationParams};

use crate::error::AudioError;
use crate::tags::{self, TagFields};

/// Age past which temp audio is eligible for cleanup.
pub const DEFAULT_TEMP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Prefix of every file this repository writes.
const FILE_PREFIX: &str = "tts_";

/// Voice label used when the parameter bag names none.
const UNKNOWN_VOICE: &str = "Unknown";

/// Outcome of persisting one variant.
///
/// `tagged` distinguishes "saved with metadata" from "saved, tag embedding
/// failed" — the file exists either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAudio {
    /// Where the variant was written.
    pub path: PathBuf,
    /// Whether the metadata embedding succeeded.
    pub tagged: bool,
}

/// Composes the deterministic file name for a generated variant.
///
/// Shape: `tts_<timestamp>_<voice>_stab<N>_sim<N>_style<N>[_boost]_<model>.<ext>`
/// where the timestamp is second-granular ISO with `:` replaced by `_`,
/// the voice name has whitespace collapsed to `-` (default `Unknown`),
/// each `N` is the setting × 100 truncated to an integer, and the `boost`
/// token appears only when speaker boost is on. Same inputs at the same
/// second produce the same name.
pub fn audio_file_name(
    created_at: &DateTime<Utc>,
    params: &GenerationParams,
    mime_type: &str,
) -> String {
    let timestamp = created_at
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
        .replace(':', "_");

    let voice = params
        .str_param("voice_name")
        .map(|name| name.split_whitespace().collect::<Vec<_>>().join("-"))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_VOICE.to_string());

    let stability = scaled_setting(params, "stability");
    let similarity = scaled_setting(params, "similarity_boost");
    let style = scaled_setting(params, "style");

    let mut name = format!(
        "{FILE_PREFIX}{timestamp}_{voice}_stab{stability}_sim{similarity}_style{style}"
    );
    if params.bool_param("use_speaker_boost").unwrap_or(false) {
        name.push_str("_boost");
    }

    let model = params.str_param("model_id").unwrap_or("unknown_model");
    name.push('_');
    name.push_str(model);

    name.push('.');
    name.push_str(extension_for(mime_type));
    name
}

fn scaled_setting(params: &GenerationParams, key: &str) -> i64 {
    (params.f64_param(key).unwrap_or(0.0) * 100.0) as i64
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        // audio/mpeg and anything unrecognized
        _ => "mp3",
    }
}

/// Writes generated audio into a dedicated temp directory and manages the
/// directory's lifecycle.
#[derive(Debug, Clone)]
pub struct AudioRepository {
    temp_dir: PathBuf,
}

impl AudioRepository {
    /// Creates the repository, creating the temp directory if needed.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir)?;
        Ok(Self { temp_dir })
    }

    /// The directory fresh audio is written into.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Persists one variant: writes the bytes, then embeds metadata.
    ///
    /// Tag embedding runs only when the parameter bag describes the
    /// generation fully (voice and model both known), and its failure is
    /// logged without failing the save — the audio file is always
    /// retained. Only a failure to write the bytes themselves is an error.
    /// On success the variant's `local_path` back-reference is assigned.
    pub fn save(&self, audio: &mut GeneratedAudio) -> Result<SavedAudio, AudioError> {
        let name = audio_file_name(&audio.created_at, &audio.params, &audio.mime_type);
        let path = self.temp_dir.join(name);

        std::fs::write(&path, &audio.bytes)?;
        tracing::info!(
            path = %path.display(),
            variant_index = audio.variant_index,
            bytes = audio.bytes.len(),
            "audio variant persisted"
        );

        let fully_described = audio.params.str_param("voice_id").is_some()
            && audio.params.str_param("model_id").is_some();

        let tagged = if fully_described {
            let fields = TagFields {
                transcription: Some(audio.source_text.clone()),
                guid: None,
                duration_secs: None,
                params: Some(audio.params.clone()),
            };
            match tags::write_tags(&path, &fields) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "tag embedding failed, keeping untagged audio"
                    );
                    false
                }
            }
        } else {
            tracing::debug!(
                path = %path.display(),
                "generation not fully described, skipping tag embedding"
            );
            false
        };

        audio.local_path = Some(path.clone());
        Ok(SavedAudio { path, tagged })
    }

    /// Persists every variant of a batch, in order.
    pub fn save_all(&self, audios: &mut [GeneratedAudio]) -> Result<Vec<SavedAudio>, AudioError> {
        let mut saved = Vec::with_capacity(audios.len());
        for audio in audios.iter_mut() {
            saved.push(self.save(audio)?);
        }
        Ok(saved)
    }

    /// Snapshot of the temp directory's files, sorted by name.
    pub fn temp_audios(&self) -> Result<Vec<PathBuf>, AudioError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.temp_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Deletes every temp file. Per-file failures are logged and do not
    /// halt cleanup of the rest. Returns the number deleted.
    pub fn clear_temp_audios(&self) -> Result<usize, AudioError> {
        self.delete_matching(|_| true)
    }

    /// Deletes temp files whose last-modified time is older than
    /// `max_age`. Returns the number deleted.
    pub fn clear_temp_audios_older_than(&self, max_age: Duration) -> Result<usize, AudioError> {
        self.delete_matching(|path| {
            let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                // The file may have been deleted since the snapshot.
                Err(_) => return false,
            };
            match modified.elapsed() {
                Ok(age) => age > max_age,
                // Modified time in the future; leave the file alone.
                Err(_) => false,
            }
        })
    }

    fn delete_matching(&self, should_delete: impl Fn(&Path) -> bool) -> Result<usize, AudioError> {
        // Snapshot first: cleanup may race a concurrent save, and a file
        // vanishing mid-iteration must not abort the sweep.
        let files = self.temp_audios()?;
        let mut deleted = 0;

        for path in files {
            if !should_delete(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete temp audio");
                }
            }
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canto_types::VoiceSettings;
    use chrono::TimeZone;

    fn params(voice_name: Option<&str>, boost: bool) -> GenerationParams {
        let settings = VoiceSettings {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.1,
            use_speaker_boost: boost,
        };
        GenerationParams::eleven_labs(
            "voice-1",
            voice_name,
            "eleven_multilingual_v2",
            &settings,
            None,
        )
    }

    fn sample_audio(variant_index: u32, bytes: &[u8]) -> GeneratedAudio {
        GeneratedAudio {
            variant_index,
            bytes: bytes.to_vec(),
            mime_type: "audio/mpeg".to_string(),
            source_text: "Hello".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap(),
            local_path: None,
            params: params(Some("Rachel"), true),
        }
    }

    #[test]
    fn file_name_is_deterministic() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();
        let p = params(Some("Rachel"), true);

        let first = audio_file_name(&created, &p, "audio/mpeg");
        let second = audio_file_name(&created, &p, "audio/mpeg");
        assert_eq!(first, second);
        assert_eq!(
            first,
            "tts_2024-03-09T14_30_05_Rachel_stab50_sim75_style10_boost_eleven_multilingual_v2.mp3"
        );
    }

    #[test]
    fn file_name_omits_boost_token_when_off() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();
        let name = audio_file_name(&created, &params(Some("Rachel"), false), "audio/mpeg");
        assert!(!name.contains("_boost_"));
        assert!(name.ends_with("_style10_eleven_multilingual_v2.mp3"));
    }

    #[test]
    fn file_name_defaults_voice_to_unknown_and_joins_whitespace() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();

        let name = audio_file_name(&created, &params(None, true), "audio/mpeg");
        assert!(name.contains("_Unknown_"), "got: {name}");

        let name = audio_file_name(&created, &params(Some("Old Timey Narrator"), true), "audio/mpeg");
        assert!(name.contains("_Old-Timey-Narrator_"), "got: {name}");
    }

    #[test]
    fn save_all_writes_every_variant_as_mp3() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = AudioRepository::new(dir.path().join("temp_audio")).expect("repo");

        let audios = vec![
            sample_audio(0, b"variant zero bytes"),
            sample_audio(1, b"variant one bytes!"),
            sample_audio(2, b"variant two bytes!!"),
        ];
        // Variants in the same second with the same settings share a name;
        // the paced generation loop spaces them out, so mirror that here.
        let mut audios: Vec<GeneratedAudio> = audios
            .into_iter()
            .map(|mut audio| {
                audio.created_at =
                    audio.created_at + chrono::Duration::seconds(i64::from(audio.variant_index));
                audio
            })
            .collect();

        let saved = repo.save_all(&mut audios).expect("save_all");
        assert_eq!(saved.len(), 3);
        for (audio, entry) in audios.iter().zip(&saved) {
            assert!(entry.path.exists(), "file should exist: {:?}", entry.path);
            assert_eq!(entry.path.extension().and_then(|e| e.to_str()), Some("mp3"));
            assert!(entry.tagged, "fully described audio should be tagged");
            assert_eq!(
                audio.local_path.as_deref(),
                Some(entry.path.as_path()),
                "persistence must assign the back-reference"
            );
        }
    }

    #[test]
    fn save_skips_tagging_when_voice_or_model_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = AudioRepository::new(dir.path().join("temp_audio")).expect("repo");

        let mut audio = sample_audio(0, b"bytes");
        audio.params = GenerationParams::new("elevenlabs");

        let saved = repo.save(&mut audio).expect("save");
        assert!(saved.path.exists());
        assert!(!saved.tagged);
    }

    #[test]
    fn clear_then_list_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = AudioRepository::new(dir.path().join("temp_audio")).expect("repo");

        repo.save(&mut sample_audio(0, b"bytes")).expect("save");
        assert_eq!(repo.temp_audios().expect("list").len(), 1);

        let deleted = repo.clear_temp_audios().expect("clear");
        assert_eq!(deleted, 1);
        assert!(repo.temp_audios().expect("list").is_empty());
    }

    #[test]
    fn age_based_cleanup_spares_fresh_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = AudioRepository::new(dir.path().join("temp_audio")).expect("repo");
        repo.save(&mut sample_audio(0, b"bytes")).expect("save");

        let deleted = repo
            .clear_temp_audios_older_than(DEFAULT_TEMP_MAX_AGE)
            .expect("cleanup");
        assert_eq!(deleted, 0, "a just-written file is not stale");
        assert_eq!(repo.temp_audios().expect("list").len(), 1);

        let deleted = repo
            .clear_temp_audios_older_than(Duration::ZERO)
            .expect("cleanup");
        assert_eq!(deleted, 1, "zero max-age treats everything as stale");
        assert!(repo.temp_audios().expect("list").is_empty());
    }
}
