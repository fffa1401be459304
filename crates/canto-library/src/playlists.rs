//! Playlist management with explicit position-based ordering.
//!
//! Every playlist entry carries an integer `position`; the sequence within
//! a playlist is kept dense (`0..n-1`) by the mutation functions here.
//! Appends assign `MAX(position) + 1` atomically inside the INSERT, removes
//! compact the tail, and moves shift the affected range — all inside a
//! transaction so a crash cannot leave holes.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// A playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    /// Internal database ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// One entry of a playlist, ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistEntry {
    /// GUID of the referenced track.
    pub track_guid: String,
    /// Zero-based position within the playlist.
    pub position: i64,
    /// When the track was added (ISO 8601).
    pub added_at: String,
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn require_playlist(conn: &Connection, id: i64) -> Result<(), LibraryError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM playlists WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(LibraryError::PlaylistNotFound(id))
    }
}

/// Creates a new, empty playlist.
pub fn create_playlist(conn: &Connection, name: &str) -> Result<Playlist, LibraryError> {
    conn.execute("INSERT INTO playlists (name) VALUES (?1)", [name])?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT id, name, created_at FROM playlists WHERE id = ?1",
        [id],
        playlist_from_row,
    )
    .map_err(LibraryError::from)
}

/// Renames a playlist.
pub fn rename_playlist(conn: &Connection, id: i64, name: &str) -> Result<(), LibraryError> {
    let updated = conn.execute(
        "UPDATE playlists SET name = ?2 WHERE id = ?1",
        params![id, name],
    )?;
    if updated == 0 {
        return Err(LibraryError::PlaylistNotFound(id));
    }
    Ok(())
}

/// Deletes a playlist. Junction rows cascade.
pub fn delete_playlist(conn: &Connection, id: i64) -> Result<(), LibraryError> {
    let deleted = conn.execute("DELETE FROM playlists WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(LibraryError::PlaylistNotFound(id));
    }
    Ok(())
}

/// Lists all playlists, oldest first.
pub fn list_playlists(conn: &Connection) -> Result<Vec<Playlist>, LibraryError> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM playlists ORDER BY id ASC")?;
    let rows = stmt.query_map([], playlist_from_row)?;

    let mut playlists = Vec::new();
    for row in rows {
        playlists.push(row?);
    }
    Ok(playlists)
}

/// Appends a track to the end of a playlist, returning its position.
///
/// The position is computed as `MAX(position) + 1` within the same INSERT,
/// so two concurrent appends cannot observe the same tail.
pub fn append_track(
    conn: &Connection,
    playlist_id: i64,
    track_guid: &str,
) -> Result<i64, LibraryError> {
    require_playlist(conn, playlist_id)?;

    let position = conn.query_row(
        "INSERT INTO playlist_tracks (playlist_id, track_guid, position)
         VALUES (
            ?1, ?2,
            (SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_tracks WHERE playlist_id = ?1)
         )
         RETURNING position",
        params![playlist_id, track_guid],
        |row| row.get(0),
    )?;

    Ok(position)
}

/// Removes a track from a playlist and compacts the positions behind it.
pub fn remove_track(
    conn: &Connection,
    playlist_id: i64,
    track_guid: &str,
) -> Result<(), LibraryError> {
    require_playlist(conn, playlist_id)?;

    let tx = conn.unchecked_transaction()?;

    let removed: Option<i64> = tx
        .query_row(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_guid = ?2
             RETURNING position",
            params![playlist_id, track_guid],
            |row| row.get(0),
        )
        .optional()?;

    let Some(position) = removed else {
        return Err(LibraryError::TrackNotFound(track_guid.to_string()));
    };

    tx.execute(
        "UPDATE playlist_tracks SET position = position - 1
         WHERE playlist_id = ?1 AND position > ?2",
        params![playlist_id, position],
    )?;

    tx.commit()?;
    Ok(())
}

/// Moves a track to a new position, shifting the entries in between.
///
/// `new_position` is clamped to the playlist's current bounds. The sequence
/// stays dense `0..n-1` afterwards.
pub fn move_track(
    conn: &Connection,
    playlist_id: i64,
    track_guid: &str,
    new_position: i64,
) -> Result<(), LibraryError> {
    require_playlist(conn, playlist_id)?;

    let tx = conn.unchecked_transaction()?;

    let old_position: Option<i64> = tx
        .query_row(
            "SELECT position FROM playlist_tracks WHERE playlist_id = ?1 AND track_guid = ?2",
            params![playlist_id, track_guid],
            |row| row.get(0),
        )
        .optional()?;

    let Some(old_position) = old_position else {
        return Err(LibraryError::TrackNotFound(track_guid.to_string()));
    };

    let len: i64 = tx.query_row(
        "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
        [playlist_id],
        |row| row.get(0),
    )?;
    let new_position = new_position.clamp(0, len - 1);

    if new_position == old_position {
        tx.commit()?;
        return Ok(());
    }

    if new_position < old_position {
        // Moving towards the front: everything in [new, old) shifts back.
        tx.execute(
            "UPDATE playlist_tracks SET position = position + 1
             WHERE playlist_id = ?1 AND position >= ?2 AND position < ?3",
            params![playlist_id, new_position, old_position],
        )?;
    } else {
        // Moving towards the back: everything in (old, new] shifts forward.
        tx.execute(
            "UPDATE playlist_tracks SET position = position - 1
             WHERE playlist_id = ?1 AND position > ?2 AND position <= ?3",
            params![playlist_id, old_position, new_position],
        )?;
    }

    tx.execute(
        "UPDATE playlist_tracks SET position = ?3
         WHERE playlist_id = ?1 AND track_guid = ?2",
        params![playlist_id, track_guid, new_position],
    )?;

    tx.commit()?;
    Ok(())
}

/// Returns a playlist's entries ordered by position.
pub fn playlist_tracks(
    conn: &Connection,
    playlist_id: i64,
) -> Result<Vec<PlaylistEntry>, LibraryError> {
    require_playlist(conn, playlist_id)?;

    let mut stmt = conn.prepare(
        "SELECT track_guid, position, added_at FROM playlist_tracks
         WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map([playlist_id], |row| {
        Ok(PlaylistEntry {
            track_guid: row.get(0)?,
            position: row.get(1)?,
            added_at: row.get(2)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        canto_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    fn guids(entries: &[PlaylistEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.track_guid.as_str()).collect()
    }

    fn assert_dense(entries: &[PlaylistEntry]) {
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.position, i as i64, "positions must stay dense");
        }
    }

    #[test]
    fn append_assigns_sequential_positions() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");

        assert_eq!(append_track(&conn, playlist.id, "t0").expect("append"), 0);
        assert_eq!(append_track(&conn, playlist.id, "t1").expect("append"), 1);
        assert_eq!(append_track(&conn, playlist.id, "t2").expect("append"), 2);

        let entries = playlist_tracks(&conn, playlist.id).expect("list");
        assert_eq!(guids(&entries), vec!["t0", "t1", "t2"]);
        assert_dense(&entries);
    }

    #[test]
    fn remove_compacts_positions() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");
        for guid in ["t0", "t1", "t2", "t3"] {
            append_track(&conn, playlist.id, guid).expect("append");
        }

        remove_track(&conn, playlist.id, "t1").expect("remove");

        let entries = playlist_tracks(&conn, playlist.id).expect("list");
        assert_eq!(guids(&entries), vec!["t0", "t2", "t3"]);
        assert_dense(&entries);
    }

    #[test]
    fn move_track_forward_and_back() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");
        for guid in ["t0", "t1", "t2", "t3"] {
            append_track(&conn, playlist.id, guid).expect("append");
        }

        move_track(&conn, playlist.id, "t0", 2).expect("move to back half");
        let entries = playlist_tracks(&conn, playlist.id).expect("list");
        assert_eq!(guids(&entries), vec!["t1", "t2", "t0", "t3"]);
        assert_dense(&entries);

        move_track(&conn, playlist.id, "t3", 0).expect("move to front");
        let entries = playlist_tracks(&conn, playlist.id).expect("list");
        assert_eq!(guids(&entries), vec!["t3", "t1", "t2", "t0"]);
        assert_dense(&entries);
    }

    #[test]
    fn move_clamps_out_of_range_positions() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");
        for guid in ["t0", "t1", "t2"] {
            append_track(&conn, playlist.id, guid).expect("append");
        }

        move_track(&conn, playlist.id, "t0", 99).expect("clamped to end");
        let entries = playlist_tracks(&conn, playlist.id).expect("list");
        assert_eq!(guids(&entries), vec!["t1", "t2", "t0"]);
        assert_dense(&entries);
    }

    #[test]
    fn delete_playlist_cascades_entries() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");
        append_track(&conn, playlist.id, "t0").expect("append");

        delete_playlist(&conn, playlist.id).expect("delete");

        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
                [playlist.id],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(orphans, 0, "junction rows must cascade");
    }

    #[test]
    fn unknown_playlist_is_an_error() {
        let conn = test_db();
        let err = append_track(&conn, 42, "t0").expect_err("should fail");
        assert!(matches!(err, LibraryError::PlaylistNotFound(42)));
    }

    #[test]
    fn rename_playlist_updates_name() {
        let conn = test_db();
        let playlist = create_playlist(&conn, "Morning").expect("create");
        rename_playlist(&conn, playlist.id, "Evening").expect("rename");

        let playlists = list_playlists(&conn).expect("list");
        assert_eq!(playlists[0].name, "Evening");
    }
}
