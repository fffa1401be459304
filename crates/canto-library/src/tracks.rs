//! Track catalog operations.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// A track known to the library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Internal database ID.
    pub id: i64,
    /// Content-addressable GUID, unique across the library.
    pub guid: String,
    /// Audio-content checksum (MD5 hex), when known.
    pub checksum: Option<String>,
    /// Folder the file lives in, relative to the music root.
    pub folder: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last-modified timestamp (ISO 8601).
    pub updated_at: String,
}

/// Parameters for inserting or refreshing a track.
#[derive(Debug, Clone, Default)]
pub struct UpsertTrack<'a> {
    pub guid: &'a str,
    pub checksum: Option<&'a str>,
    pub folder: Option<&'a str>,
    pub title: Option<&'a str>,
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        guid: row.get(1)?,
        checksum: row.get(2)?,
        folder: row.get(3)?,
        title: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const TRACK_COLUMNS: &str = "id, guid, checksum, folder, title, created_at, updated_at";

/// Inserts a track, or refreshes its metadata if the GUID already exists.
///
/// On conflict the checksum, folder, and title are replaced and
/// `updated_at` is stamped; `created_at` and the row ID are preserved.
pub fn upsert_track(conn: &Connection, track: &UpsertTrack<'_>) -> Result<Track, LibraryError> {
    conn.execute(
        "INSERT INTO tracks (guid, checksum, folder, title) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(guid) DO UPDATE SET
            checksum = excluded.checksum,
            folder = excluded.folder,
            title = excluded.title,
            updated_at = datetime('now')",
        params![track.guid, track.checksum, track.folder, track.title],
    )?;

    get_track(conn, track.guid)?.ok_or_else(|| LibraryError::TrackNotFound(track.guid.to_string()))
}

/// Retrieves a track by GUID.
pub fn get_track(conn: &Connection, guid: &str) -> Result<Option<Track>, LibraryError> {
    let track = conn
        .query_row(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE guid = ?1"),
            [guid],
            track_from_row,
        )
        .optional()?;
    Ok(track)
}

/// Finds a track by its audio-content checksum.
///
/// Used at import time to detect an already-known file regardless of where
/// it currently lives.
pub fn find_track_by_checksum(
    conn: &Connection,
    checksum: &str,
) -> Result<Option<Track>, LibraryError> {
    let track = conn
        .query_row(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE checksum = ?1 LIMIT 1"),
            [checksum],
            track_from_row,
        )
        .optional()?;
    Ok(track)
}

/// Lists all tracks, oldest first.
pub fn list_tracks(conn: &Connection) -> Result<Vec<Track>, LibraryError> {
    let mut stmt = conn.prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id ASC"))?;
    let rows = stmt.query_map([], track_from_row)?;

    let mut tracks = Vec::new();
    for row in rows {
        tracks.push(row?);
    }
    Ok(tracks)
}

/// Deletes a track by GUID.
pub fn delete_track(conn: &Connection, guid: &str) -> Result<(), LibraryError> {
    let deleted = conn.execute("DELETE FROM tracks WHERE guid = ?1", [guid])?;
    if deleted == 0 {
        return Err(LibraryError::TrackNotFound(guid.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        canto_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let conn = test_db();
        let guid = uuid::Uuid::new_v4().to_string();

        let inserted = upsert_track(
            &conn,
            &UpsertTrack {
                guid: &guid,
                checksum: Some("aaaa"),
                folder: Some("generated"),
                title: Some("Hello"),
            },
        )
        .expect("insert");
        assert_eq!(inserted.guid, guid);
        assert_eq!(inserted.checksum.as_deref(), Some("aaaa"));

        let updated = upsert_track(
            &conn,
            &UpsertTrack {
                guid: &guid,
                checksum: Some("bbbb"),
                folder: Some("music"),
                title: Some("Hello again"),
            },
        )
        .expect("update");

        assert_eq!(updated.id, inserted.id, "upsert must keep the row id");
        assert_eq!(updated.created_at, inserted.created_at);
        assert_eq!(updated.checksum.as_deref(), Some("bbbb"));
        assert_eq!(updated.title.as_deref(), Some("Hello again"));

        assert_eq!(list_tracks(&conn).expect("list").len(), 1);
    }

    #[test]
    fn find_by_checksum() {
        let conn = test_db();
        let guid = uuid::Uuid::new_v4().to_string();
        upsert_track(
            &conn,
            &UpsertTrack {
                guid: &guid,
                checksum: Some("cafe"),
                ..Default::default()
            },
        )
        .expect("insert");

        let found = find_track_by_checksum(&conn, "cafe").expect("find");
        assert_eq!(found.map(|t| t.guid), Some(guid));
        assert_eq!(find_track_by_checksum(&conn, "beef").expect("find"), None);
    }

    #[test]
    fn delete_unknown_track_fails() {
        let conn = test_db();
        let err = delete_track(&conn, "no-such-guid").expect_err("should fail");
        assert!(matches!(err, LibraryError::TrackNotFound(_)));
    }
}
