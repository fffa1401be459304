//! Database backup snapshots and the periodic backup task.
//!
//! Backups are taken with `VACUUM INTO`, which produces a compact,
//! self-contained copy of the database without blocking readers. Snapshot
//! files are named `canto-YYYYMMDD-HHMMSS.db`, so lexicographic order is
//! chronological order and pruning can sort by name alone.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use tokio::time::sleep;

use crate::pool::DbPool;

/// Errors that can occur while taking or pruning backups.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Creating the destination directory or listing it failed.
    #[error("backup io error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot statement failed.
    #[error("backup database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not obtain a connection from the pool.
    #[error("backup pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Writes a snapshot of the database into `dest_dir`.
///
/// The destination directory is created if missing. Returns the path of the
/// snapshot file.
///
/// # Errors
///
/// Returns `BackupError::Io` if the directory cannot be created, or
/// `BackupError::Database` if the `VACUUM INTO` statement fails (for
/// example, when the destination file already exists).
pub fn backup_database(conn: &Connection, dest_dir: &Path) -> Result<PathBuf, BackupError> {
    std::fs::create_dir_all(dest_dir)?;

    let file_name = format!("canto-{}.db", Utc::now().format("%Y%m%d-%H%M%S"));
    let dest = dest_dir.join(file_name);

    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy().as_ref()])?;

    tracing::info!(path = %dest.display(), "database snapshot written");
    Ok(dest)
}

/// Deletes the oldest snapshots in `dir` beyond the newest `keep`.
///
/// Only files matching the `canto-*.db` snapshot naming are considered.
/// Per-file delete failures are logged and do not halt pruning of the
/// remaining files. Returns the number of snapshots deleted.
///
/// # Errors
///
/// Returns `BackupError::Io` only if the directory itself cannot be read.
pub fn prune_backups(dir: &Path, keep: usize) -> Result<usize, BackupError> {
    let mut snapshots: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("canto-") && n.ends_with(".db"))
        })
        .collect();

    // Name order is chronological order.
    snapshots.sort();

    let excess = snapshots.len().saturating_sub(keep);
    let mut deleted = 0;

    for path in snapshots.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to prune snapshot");
            }
        }
    }

    Ok(deleted)
}

/// Starts a background task that periodically snapshots the database.
///
/// This task runs indefinitely. Each cycle sleeps first, then takes a
/// snapshot and prunes old ones; failures are logged and the loop
/// continues.
///
/// # Arguments
///
/// * `pool` - Database connection pool.
/// * `interval_seconds` - Time in seconds between snapshots.
/// * `dest_dir` - Directory receiving snapshot files.
/// * `keep` - Number of most recent snapshots to retain.
pub async fn start_backup_task(pool: DbPool, interval_seconds: u64, dest_dir: PathBuf, keep: usize) {
    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(
        interval_seconds,
        dir = %dest_dir.display(),
        keep,
        "starting database backup task"
    );

    loop {
        sleep(interval).await;

        let pool_clone = pool.clone();
        let dir = dest_dir.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = pool_clone.get()?;
            let path = backup_database(&conn, &dir)?;
            let pruned = prune_backups(&dir, keep)?;
            Ok::<(PathBuf, usize), BackupError>((path, pruned))
        })
        .await;

        match result {
            Ok(Ok((path, pruned))) => {
                tracing::info!(path = %path.display(), pruned, "backup cycle complete");
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "backup cycle failed");
            }
            Err(e) => {
                tracing::error!(error = %e, "backup task panicked or was cancelled");
            }
        }
    }
}
