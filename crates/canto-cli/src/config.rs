//! Configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Audio persistence settings.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Speech provider settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Backup settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Audio persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory freshly generated audio is written into.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Age in hours past which temp audio is eligible for cleanup.
    #[serde(default = "default_temp_max_age_hours")]
    pub temp_max_age_hours: u64,
}

/// Speech provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// Provider API base URL.
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,

    /// Per-call HTTP timeout, in seconds.
    #[serde(default = "default_tts_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Model used for synthesis.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Variants generated per request.
    #[serde(default = "default_variant_count")]
    pub variant_count: u32,

    /// Pause between successive variant calls, in milliseconds.
    #[serde(default = "default_variant_delay_ms")]
    pub variant_delay_ms: u64,
}

/// Backup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    /// Directory receiving database snapshots.
    #[serde(default = "default_backup_dir")]
    pub dir: String,

    /// Number of most recent snapshots to retain.
    #[serde(default = "default_backup_keep")]
    pub keep: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "canto=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "canto.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_temp_dir() -> String {
    "temp_audio".to_string()
}

fn default_temp_max_age_hours() -> u64 {
    24
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_tts_timeout_seconds() -> u64 {
    60
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_variant_count() -> u32 {
    3
}

fn default_variant_delay_ms() -> u64 {
    500
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_backup_keep() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            temp_max_age_hours: default_temp_max_age_hours(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            timeout_seconds: default_tts_timeout_seconds(),
            model_id: default_model_id(),
            variant_count: default_variant_count(),
            variant_delay_ms: default_variant_delay_ms(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            keep: default_backup_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CANTO_DB_PATH` overrides `database.path`
/// - `CANTO_TEMP_DIR` overrides `audio.temp_dir`
/// - `CANTO_TTS_BASE_URL` overrides `tts.base_url`
/// - `CANTO_LOG_LEVEL` overrides `logging.level`
/// - `CANTO_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(db_path) = std::env::var("CANTO_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(temp_dir) = std::env::var("CANTO_TEMP_DIR") {
        config.audio.temp_dir = temp_dir;
    }
    if let Ok(base_url) = std::env::var("CANTO_TTS_BASE_URL") {
        config.tts.base_url = base_url;
    }
    if let Ok(level) = std::env::var("CANTO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("CANTO_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some("definitely/not/a/real/config.toml"))
            .expect("missing file falls back to defaults");
        assert_eq!(config.database.path, "canto.db");
        assert_eq!(config.tts.variant_count, 3);
        assert_eq!(config.tts.variant_delay_ms, 500);
        assert_eq!(config.backup.keep, 5);
        assert!(!config.logging.json);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tts]\nvariant_count = 5\n\n[database]\npath = \"player.db\"\n",
        )
        .expect("write config");

        let config = load_config(path.to_str()).expect("load");
        assert_eq!(config.tts.variant_count, 5);
        assert_eq!(config.database.path, "player.db");
        // Untouched sections keep their defaults.
        assert_eq!(config.tts.model_id, "eleven_multilingual_v2");
        assert_eq!(config.audio.temp_max_age_hours, 24);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml = = =").expect("write config");

        assert!(load_config(path.to_str()).is_err());
    }
}
