//! Relational library layer for canto.
//!
//! Implements the track catalog, playlist management with explicit
//! position-based ordering, and the append-only play-event log. The
//! surrounding player reads and writes through these functions; the
//! generation pipeline emits freshly imported tracks into the same tables.
//!
//! All operations are free functions over a `rusqlite::Connection`,
//! returning `LibraryError` on failure. Multi-statement mutations (playlist
//! reordering) run inside a transaction so position sequences stay dense.

mod error;
mod events;
mod playlists;
mod tracks;

pub use error::LibraryError;
pub use events::{plays_for_track, recent_plays, record_play, PlayEvent};
pub use playlists::{
    append_track, create_playlist, delete_playlist, list_playlists, move_track, playlist_tracks,
    remove_track, rename_playlist, Playlist, PlaylistEntry,
};
pub use tracks::{
    delete_track, find_track_by_checksum, get_track, list_tracks, upsert_track, Track, UpsertTrack,
};
