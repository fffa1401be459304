//! Database layer for canto.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and periodic database backups. Every table in
//! canto — tracks, playlists, the play-event log, and the API-key store —
//! is created through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the library lives on the listener's device;
//!   no external database process. WAL allows concurrent readers with a
//!   single writer, which matches the player's access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled in via `include_str!`,
//!   so the schema ships with the binary and cannot drift from the code
//!   that depends on it.
//! - **`VACUUM INTO` backups**: snapshots are plain database files written
//!   next to the library, pruned to a configurable count.

mod backup;
mod migrations;
mod pool;

pub use backup::{backup_database, prune_backups, start_backup_task, BackupError};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
