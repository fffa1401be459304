//! Append-only play-event log.
//!
//! Every playback start is recorded as one row keyed by track GUID and
//! timestamp, with an optional playback speed. Rows are never updated or
//! deleted by the application.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// One recorded playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayEvent {
    /// Auto-incremented row ID.
    pub id: i64,
    /// GUID of the played track.
    pub track_guid: String,
    /// When playback started (ISO 8601).
    pub played_at: String,
    /// Playback speed, recorded only when it differs from 1.0.
    pub speed: Option<f64>,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<PlayEvent> {
    Ok(PlayEvent {
        id: row.get(0)?,
        track_guid: row.get(1)?,
        played_at: row.get(2)?,
        speed: row.get(3)?,
    })
}

/// Appends a play event for the given track.
pub fn record_play(
    conn: &Connection,
    track_guid: &str,
    speed: Option<f64>,
) -> Result<PlayEvent, LibraryError> {
    let event = conn.query_row(
        "INSERT INTO play_events (track_guid, speed) VALUES (?1, ?2)
         RETURNING id, track_guid, played_at, speed",
        params![track_guid, speed],
        event_from_row,
    )?;
    Ok(event)
}

/// Returns the play history of one track, newest first.
pub fn plays_for_track(
    conn: &Connection,
    track_guid: &str,
    limit: i64,
) -> Result<Vec<PlayEvent>, LibraryError> {
    let mut stmt = conn.prepare(
        "SELECT id, track_guid, played_at, speed FROM play_events
         WHERE track_guid = ?1 ORDER BY played_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![track_guid, limit], event_from_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Returns the most recent play events across all tracks, newest first.
pub fn recent_plays(conn: &Connection, limit: i64) -> Result<Vec<PlayEvent>, LibraryError> {
    let mut stmt = conn.prepare(
        "SELECT id, track_guid, played_at, speed FROM play_events
         ORDER BY played_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], event_from_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
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
    fn record_play_appends_rows() {
        let conn = test_db();

        let first = record_play(&conn, "track-a", None).expect("record");
        let second = record_play(&conn, "track-a", Some(1.5)).expect("record");

        assert!(second.id > first.id, "events are append-only");
        assert_eq!(first.speed, None);
        assert_eq!(second.speed, Some(1.5));
    }

    #[test]
    fn plays_for_track_filters_and_orders() {
        let conn = test_db();
        record_play(&conn, "track-a", None).expect("record");
        record_play(&conn, "track-b", None).expect("record");
        record_play(&conn, "track-a", Some(2.0)).expect("record");

        let plays = plays_for_track(&conn, "track-a", 10).expect("query");
        assert_eq!(plays.len(), 2);
        assert!(
            plays[0].id > plays[1].id,
            "newest event must come first"
        );
        assert!(plays.iter().all(|e| e.track_guid == "track-a"));
    }

    #[test]
    fn recent_plays_respects_limit() {
        let conn = test_db();
        for i in 0..5 {
            record_play(&conn, &format!("track-{i}"), None).expect("record");
        }

        let recent = recent_plays(&conn, 3).expect("query");
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].track_guid, "track-4");
    }
}
