//! Audio persistence and in-file metadata for canto.
//!
//! Persists generated audio variants into a dedicated temp directory under
//! deterministic, human-auditable file names, and embeds generation
//! metadata into the files through an ID3 tag codec with a canto-owned
//! frame namespace.
//!
//! The guiding rule throughout: preserve the user's generated audio over
//! completeness of metadata. A failed tag write keeps the file; cleanup
//! failures skip to the next file.

mod error;
mod repository;
mod tags;

pub use error::{AudioError, TagError};
pub use repository::{audio_file_name, AudioRepository, SavedAudio, DEFAULT_TEMP_MAX_AGE};
pub use tags::{audio_checksum, read_tags, write_tags, TagBundle, TagFields};
