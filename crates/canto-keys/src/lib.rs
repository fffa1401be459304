//! Provider credential store with per-key character-quota bookkeeping.
//!
//! Holds ElevenLabs API keys and their usage counters, and designates at
//! most one key as *active* — the credential the generation pipeline uses.
//! The "exactly one active" rule is a cross-row constraint that no column
//! constraint can express, so activation is an explicit transactional
//! deactivate-all-then-activate-one routine: a savepoint spans both steps,
//! and a failed activation rolls back as a unit.
//!
//! Absence of an active key is a legitimate, expected state (first run,
//! revoked key), surfaced as `None` rather than an error.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during key-store operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key store database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("api key not found: {0}")]
    KeyNotFound(i64),
}

/// A stored provider credential and its quota counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKey {
    /// Internal database ID.
    pub id: i64,
    /// Account email the key belongs to.
    pub email: String,
    /// The provider API key.
    pub api_key: String,
    /// Voice used when a generation request names none.
    pub default_voice_id: Option<String>,
    /// Whether this is the key the pipeline currently uses.
    pub active: bool,
    /// When this key last completed a generation batch (ISO 8601).
    pub last_used: Option<String>,
    /// Provider character allowance for the current quota window.
    pub character_limit: i64,
    /// Characters consumed in the current quota window.
    pub character_count: i64,
    /// Unix time at which the provider resets the character count.
    pub next_reset_unix: i64,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl ApiKey {
    /// Characters still available in the current quota window.
    ///
    /// Saturates at zero; the provider may report a count past the limit.
    pub fn remaining_characters(&self) -> i64 {
        (self.character_limit - self.character_count).max(0)
    }
}

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: row.get(0)?,
        email: row.get(1)?,
        api_key: row.get(2)?,
        default_voice_id: row.get(3)?,
        active: row.get(4)?,
        last_used: row.get(5)?,
        character_limit: row.get(6)?,
        character_count: row.get(7)?,
        next_reset_unix: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const KEY_COLUMNS: &str = "id, email, api_key, default_voice_id, active, last_used,
    character_limit, character_count, next_reset_unix, created_at";

/// Stores a new credential. New keys start inactive.
pub fn add_key(
    conn: &Connection,
    email: &str,
    api_key: &str,
    default_voice_id: Option<&str>,
) -> Result<ApiKey, KeyError> {
    conn.execute(
        "INSERT INTO api_keys (email, api_key, default_voice_id) VALUES (?1, ?2, ?3)",
        params![email, api_key, default_voice_id],
    )?;
    let id = conn.last_insert_rowid();
    get_key(conn, id)?.ok_or(KeyError::KeyNotFound(id))
}

/// Retrieves a key by ID.
pub fn get_key(conn: &Connection, id: i64) -> Result<Option<ApiKey>, KeyError> {
    let key = conn
        .query_row(
            &format!("SELECT {KEY_COLUMNS} FROM api_keys WHERE id = ?1"),
            [id],
            key_from_row,
        )
        .optional()?;
    Ok(key)
}

/// Lists all stored keys, oldest first.
pub fn list_keys(conn: &Connection) -> Result<Vec<ApiKey>, KeyError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {KEY_COLUMNS} FROM api_keys ORDER BY id ASC"))?;
    let rows = stmt.query_map([], key_from_row)?;

    let mut keys = Vec::new();
    for row in rows {
        keys.push(row?);
    }
    Ok(keys)
}

/// Returns the active key, if any.
///
/// At most one row can be active; `None` means no credential is configured,
/// which callers must treat as an expected state.
pub fn active_key(conn: &Connection) -> Result<Option<ApiKey>, KeyError> {
    let key = conn
        .query_row(
            &format!("SELECT {KEY_COLUMNS} FROM api_keys WHERE active = 1 LIMIT 1"),
            [],
            key_from_row,
        )
        .optional()?;
    Ok(key)
}

/// Makes the given key the single active credential.
///
/// Clears the active flag on every row, then sets it on the target, inside
/// one savepoint. An unknown ID rolls the savepoint back, leaving the
/// previous active key (if any) untouched — the store never ends up with
/// two active keys.
pub fn activate_key(conn: &mut Connection, id: i64) -> Result<(), KeyError> {
    let sp = conn.savepoint()?;

    sp.execute("UPDATE api_keys SET active = 0 WHERE active = 1", [])?;

    let updated = sp.execute("UPDATE api_keys SET active = 1 WHERE id = ?1", [id])?;
    if updated == 0 {
        // Dropping the savepoint without committing rolls both steps back.
        return Err(KeyError::KeyNotFound(id));
    }

    sp.commit()?;
    tracing::info!(key_id = id, "activated api key");
    Ok(())
}

/// Clears the active flag on every key.
pub fn deactivate_all(conn: &Connection) -> Result<(), KeyError> {
    conn.execute("UPDATE api_keys SET active = 0 WHERE active = 1", [])?;
    Ok(())
}

/// Persists quota counters reported by the provider's subscription
/// endpoint.
pub fn update_quota(
    conn: &Connection,
    id: i64,
    character_count: i64,
    character_limit: i64,
    next_reset_unix: i64,
) -> Result<(), KeyError> {
    let updated = conn.execute(
        "UPDATE api_keys
         SET character_count = ?2, character_limit = ?3, next_reset_unix = ?4
         WHERE id = ?1",
        params![id, character_count, character_limit, next_reset_unix],
    )?;
    if updated == 0 {
        return Err(KeyError::KeyNotFound(id));
    }
    Ok(())
}

/// Stamps the key's last-used time with the current instant.
pub fn touch_last_used(conn: &Connection, id: i64) -> Result<(), KeyError> {
    let updated = conn.execute(
        "UPDATE api_keys SET last_used = datetime('now') WHERE id = ?1",
        [id],
    )?;
    if updated == 0 {
        return Err(KeyError::KeyNotFound(id));
    }
    Ok(())
}

/// Removes a credential. Keys are only ever deleted on explicit request.
pub fn delete_key(conn: &Connection, id: i64) -> Result<(), KeyError> {
    let deleted = conn.execute("DELETE FROM api_keys WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(KeyError::KeyNotFound(id));
    }
    Ok(())
}
