use std::path::PathBuf;

use canto_audio::{audio_checksum, read_tags, write_tags, TagFields};
use canto_types::{GenerationParams, VoiceSettings};

fn scratch_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write audio bytes");
    path
}

fn sample_params() -> GenerationParams {
    GenerationParams::eleven_labs(
        "voice-1",
        Some("Rachel"),
        "eleven_multilingual_v2",
        &VoiceSettings::default(),
        Some("req-7"),
    )
}

#[test]
fn round_trip_preserves_every_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "take.mp3", b"raw audio payload bytes");
    let guid = uuid::Uuid::new_v4().to_string();

    let fields = TagFields {
        transcription: Some("Hello from the narrator".to_string()),
        guid: Some(guid.clone()),
        duration_secs: Some(12.34),
        params: Some(sample_params()),
    };
    write_tags(&path, &fields).expect("write tags");

    let bundle = read_tags(&path)
        .expect("read tags")
        .expect("bundle should be present");

    assert_eq!(
        bundle.transcription.as_deref(),
        Some("Hello from the narrator")
    );
    assert_eq!(bundle.guid.as_deref(), Some(guid.as_str()));

    let duration = bundle.duration_secs.expect("duration present");
    assert!(
        (duration - 12.34).abs() < 0.05,
        "duration should round-trip within one-decimal precision, got {duration}"
    );

    assert_eq!(bundle.params.as_ref(), Some(&sample_params()));
    assert!(bundle.creation_date.is_some());
    assert!(bundle.creation_timestamp.is_some());

    // The stored checksum matches the payload, which the tag write left
    // untouched.
    let expected = format!("{:x}", md5::compute(b"raw audio payload bytes"));
    assert_eq!(bundle.checksum.as_deref(), Some(expected.as_str()));
    assert_eq!(audio_checksum(&path).expect("checksum"), expected);
}

#[test]
fn checksum_is_invariant_under_tag_rewrites() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "take.mp3", b"the same audio every time");

    write_tags(
        &path,
        &TagFields {
            transcription: Some("first transcription".to_string()),
            ..TagFields::default()
        },
    )
    .expect("first write");
    let first = read_tags(&path)
        .expect("read")
        .expect("bundle")
        .checksum
        .expect("checksum");

    write_tags(
        &path,
        &TagFields {
            transcription: Some("a completely different, much longer transcription".to_string()),
            duration_secs: Some(3.0),
            ..TagFields::default()
        },
    )
    .expect("second write");
    let second = read_tags(&path)
        .expect("read")
        .expect("bundle")
        .checksum
        .expect("checksum");

    assert_eq!(
        first, second,
        "rewriting tags must not change the audio checksum"
    );
    assert_eq!(
        second,
        format!("{:x}", md5::compute(b"the same audio every time"))
    );
}

#[test]
fn untagged_file_reads_as_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "plain.mp3", b"no tags here");

    assert!(read_tags(&path).expect("read").is_none());
}

#[test]
fn foreign_tag_without_canto_frames_reads_as_absent() {
    use id3::{Tag, TagLike, Version};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "foreign.mp3", b"someone else's audio");

    let mut tag = Tag::new();
    tag.set_title("A Title From Another App");
    tag.write_to_path(&path, Version::Id3v24).expect("write");

    assert!(
        read_tags(&path).expect("read").is_none(),
        "a tag with no canto frame is an absent bundle"
    );
}

#[test]
fn malformed_params_drop_the_field_not_the_bundle() {
    use id3::{frame::ExtendedText, Tag, TagLike, Version};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "take.mp3", b"payload");

    write_tags(
        &path,
        &TagFields {
            transcription: Some("kept".to_string()),
            params: Some(sample_params()),
            ..TagFields::default()
        },
    )
    .expect("write");

    // Corrupt the params frame in place.
    let mut tag = Tag::read_from_path(&path).expect("read tag");
    tag.remove_extended_text(Some("CANTO_GENERATION_PARAMS"), None);
    tag.add_frame(ExtendedText {
        description: "CANTO_GENERATION_PARAMS".to_string(),
        value: "{not valid json".to_string(),
    });
    tag.write_to_path(&path, Version::Id3v24).expect("rewrite");

    let bundle = read_tags(&path).expect("read").expect("bundle");
    assert_eq!(bundle.params, None, "malformed params become an absent field");
    assert_eq!(bundle.transcription.as_deref(), Some("kept"));
    assert!(bundle.checksum.is_some());
}

#[test]
fn write_replaces_rather_than_duplicates_frames() {
    use id3::{Tag, TagLike};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = scratch_file(&dir, "take.mp3", b"payload");

    for transcription in ["one", "two", "three"] {
        write_tags(
            &path,
            &TagFields {
                transcription: Some(transcription.to_string()),
                ..TagFields::default()
            },
        )
        .expect("write");
    }

    let tag = Tag::read_from_path(&path).expect("read tag");
    let transcriptions: Vec<_> = tag
        .extended_texts()
        .filter(|ext| ext.description == "CANTO_TRANSCRIPTION")
        .collect();
    assert_eq!(transcriptions.len(), 1, "frames must be replaced, not stacked");

    let bundle = read_tags(&path).expect("read").expect("bundle");
    assert_eq!(bundle.transcription.as_deref(), Some("three"));
}
