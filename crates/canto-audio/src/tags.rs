//! ID3 tag codec for canto's in-file metadata.
//!
//! Metadata lives in ID3v2.4 `TXXX` (extended text) frames under canto's
//! own descriptions, so it coexists with whatever standard tags a player
//! writes. The audio-content checksum is computed over the audio payload
//! only — the ID3v2 block at the start of the file and a trailing ID3v1
//! block are excluded — so the stored checksum stays stable across
//! metadata rewrites.
//!
//! Reads are lenient per field: a malformed serialized value yields an
//! absent field, never a failure of the whole bundle.

use std::path::Path;

use chrono::Utc;
use id3::{frame::ExtendedText, Tag, TagLike, Version};

use canto_types::GenerationParams;

use crate::error::TagError;

const TRANSCRIPTION: &str = "CANTO_TRANSCRIPTION";
const CREATION_DATE: &str = "CANTO_CREATION_DATE";
const CREATION_TIME: &str = "CANTO_CREATION_TIME";
const DURATION: &str = "CANTO_DURATION";
const GUID: &str = "CANTO_GUID";
const AUDIO_CHECKSUM: &str = "CANTO_AUDIO_CHECKSUM";
const GENERATION_PARAMS: &str = "CANTO_GENERATION_PARAMS";

const ALL_DESCRIPTIONS: [&str; 7] = [
    TRANSCRIPTION,
    CREATION_DATE,
    CREATION_TIME,
    DURATION,
    GUID,
    AUDIO_CHECKSUM,
    GENERATION_PARAMS,
];

/// Fields supplied by the caller when writing tags.
///
/// The creation date/time and the audio checksum are stamped by the codec
/// itself at write time.
#[derive(Debug, Clone, Default)]
pub struct TagFields {
    /// The text the audio was synthesized from.
    pub transcription: Option<String>,
    /// Stable content-addressable identifier (UUIDv4 string).
    pub guid: Option<String>,
    /// Playback duration in seconds; stored with one decimal place.
    pub duration_secs: Option<f64>,
    /// Generation parameters, stored as JSON.
    pub params: Option<GenerationParams>,
}

/// The metadata read back from a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagBundle {
    pub transcription: Option<String>,
    /// Creation date, `YYYY-MM-DD`.
    pub creation_date: Option<String>,
    /// Creation time, epoch seconds.
    pub creation_timestamp: Option<i64>,
    /// Duration in seconds, one-decimal precision.
    pub duration_secs: Option<f64>,
    pub guid: Option<String>,
    /// MD5 hex of the audio payload.
    pub checksum: Option<String>,
    pub params: Option<GenerationParams>,
}

impl TagBundle {
    /// True iff every field is absent. Placeholder defaults are never
    /// consulted — an all-`None` bundle is empty, nothing else is.
    pub fn is_empty(&self) -> bool {
        self.transcription.is_none()
            && self.creation_date.is_none()
            && self.creation_timestamp.is_none()
            && self.duration_secs.is_none()
            && self.guid.is_none()
            && self.checksum.is_none()
            && self.params.is_none()
    }
}

/// Computes the MD5 hex checksum of the file's audio payload.
///
/// The payload excludes the metadata container bytes: a leading ID3v2
/// block (header, syncsafe-sized body, optional footer) and a trailing
/// 128-byte ID3v1 block.
pub fn audio_checksum(path: &Path) -> Result<String, TagError> {
    let bytes = std::fs::read(path)?;
    let (start, end) = audio_payload_range(&bytes);
    Ok(format!("{:x}", md5::compute(&bytes[start..end])))
}

/// Writes canto's tag bundle into the file.
///
/// Recomputes and stores the audio-payload checksum, stamps the creation
/// date and time, and replaces any existing canto frames. The audio bytes
/// themselves are never touched.
pub fn write_tags(path: &Path, fields: &TagFields) -> Result<(), TagError> {
    let checksum = audio_checksum(path)?;

    let mut tag = read_existing_tag(path)?.unwrap_or_else(Tag::new);

    for description in ALL_DESCRIPTIONS {
        tag.remove_extended_text(Some(description), None);
    }

    let now = Utc::now();
    add_text(&mut tag, CREATION_DATE, now.format("%Y-%m-%d").to_string());
    add_text(&mut tag, CREATION_TIME, now.timestamp().to_string());
    add_text(&mut tag, AUDIO_CHECKSUM, checksum);

    if let Some(ref transcription) = fields.transcription {
        add_text(&mut tag, TRANSCRIPTION, transcription.clone());
    }
    if let Some(ref guid) = fields.guid {
        add_text(&mut tag, GUID, guid.clone());
    }
    if let Some(duration) = fields.duration_secs {
        add_text(&mut tag, DURATION, format!("{duration:.1}"));
    }
    if let Some(ref params) = fields.params {
        match serde_json::to_string(params) {
            Ok(json) => add_text(&mut tag, GENERATION_PARAMS, json),
            Err(e) => {
                tracing::warn!(error = %e, "generation params not serializable, omitting frame");
            }
        }
    }

    tag.write_to_path(path, Version::Id3v24)?;
    Ok(())
}

/// Reads canto's tag bundle from the file.
///
/// Returns `None` when the file carries no ID3 tag or no canto frame.
/// Individual fields that fail to parse are dropped, not propagated.
pub fn read_tags(path: &Path) -> Result<Option<TagBundle>, TagError> {
    let Some(tag) = read_existing_tag(path)? else {
        return Ok(None);
    };

    let mut bundle = TagBundle::default();

    for ext in tag.extended_texts() {
        // `ExtendedText` values may carry a trailing NUL from the frame
        // encoding; strip it before interpreting.
        let value = ext.value.trim_end_matches('\0').to_string();
        match ext.description.as_str() {
            TRANSCRIPTION => bundle.transcription = Some(value),
            CREATION_DATE => bundle.creation_date = Some(value),
            CREATION_TIME => bundle.creation_timestamp = value.parse().ok(),
            DURATION => bundle.duration_secs = value.parse().ok(),
            GUID => bundle.guid = Some(value),
            AUDIO_CHECKSUM => bundle.checksum = Some(value),
            GENERATION_PARAMS => {
                bundle.params = match serde_json::from_str(&value) {
                    Ok(params) => Some(params),
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "malformed generation params frame, dropping field"
                        );
                        None
                    }
                }
            }
            _ => {}
        }
    }

    if bundle.is_empty() {
        return Ok(None);
    }
    Ok(Some(bundle))
}

fn read_existing_tag(path: &Path) -> Result<Option<Tag>, TagError> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(Some(tag)),
        Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Ok(None),
        Err(e) => Err(TagError::Id3(e)),
    }
}

fn add_text(tag: &mut Tag, description: &str, value: String) {
    tag.add_frame(ExtendedText {
        description: description.to_string(),
        value,
    });
}

/// Returns the byte range of the audio payload, excluding metadata blocks.
fn audio_payload_range(bytes: &[u8]) -> (usize, usize) {
    let mut start = 0;
    if bytes.len() >= 10 && &bytes[0..3] == b"ID3" {
        let size = syncsafe_size(&bytes[6..10]);
        let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
        start = (10 + size + footer).min(bytes.len());
    }

    let mut end = bytes.len();
    if end.saturating_sub(start) >= 128 && &bytes[end - 128..end - 125] == b"TAG" {
        end -= 128;
    }

    (start, end)
}

/// Decodes an ID3v2 syncsafe 28-bit size.
fn syncsafe_size(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_range_without_metadata_is_whole_file() {
        let bytes = b"plain audio bytes".to_vec();
        assert_eq!(audio_payload_range(&bytes), (0, bytes.len()));
    }

    #[test]
    fn payload_range_skips_id3v2_header() {
        // 10-byte header declaring a 20-byte tag body, then payload.
        let mut bytes = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 20];
        bytes.extend(std::iter::repeat(0u8).take(20));
        bytes.extend_from_slice(b"payload");

        let (start, end) = audio_payload_range(&bytes);
        assert_eq!(&bytes[start..end], b"payload");
    }

    #[test]
    fn payload_range_skips_trailing_id3v1() {
        let mut bytes = b"payload".to_vec();
        let mut v1 = vec![0u8; 128];
        v1[0..3].copy_from_slice(b"TAG");
        bytes.extend_from_slice(&v1);

        let (start, end) = audio_payload_range(&bytes);
        assert_eq!(&bytes[start..end], b"payload");
    }

    #[test]
    fn syncsafe_decoding() {
        assert_eq!(syncsafe_size(&[0, 0, 0, 0]), 0);
        assert_eq!(syncsafe_size(&[0, 0, 0, 0x7f]), 127);
        assert_eq!(syncsafe_size(&[0, 0, 1, 0]), 128);
        assert_eq!(syncsafe_size(&[0, 0, 2, 1]), 257);
    }

    #[test]
    fn empty_bundle_iff_all_fields_absent() {
        let mut bundle = TagBundle::default();
        assert!(bundle.is_empty());

        bundle.checksum = Some("d41d8cd98f00b204e9800998ecf8427e".to_string());
        assert!(!bundle.is_empty());
    }
}
