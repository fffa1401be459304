//! canto command-line tool — the entry point for the generation pipeline.
//!
//! Loads configuration, initializes structured logging and the database,
//! then dispatches one subcommand: credential management, speech
//! generation, voice/history lookups, temp-audio cleanup, or a database
//! backup.
//!
//! The config file defaults to `config.toml` next to the binary and can be
//! pointed elsewhere with `CANTO_CONFIG_PATH`.

mod config;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use canto_audio::AudioRepository;
use canto_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use canto_library::UpsertTrack;
use canto_tts::{
    ElevenLabsClient, ElevenLabsConfig, GenerationRequest, Generator, HistoryQuery,
};
use canto_types::AudioGenerationResult;

use config::Config;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Ok(path) = std::env::var("CANTO_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }
    (None, "default")
}

fn usage() -> ! {
    eprintln!(
        "usage: canto <command>

commands:
  keys add <email> <api-key> [default-voice-id]   store a credential
  keys list                                       list stored credentials
  keys activate <id>                              make one credential active
  keys remove <id>                                delete a credential
  generate <text> [voice-id]                      synthesize variants and save them
  voices                                          list voices for the active credential
  history [page-size]                             show recent provider generations
  history audio <item-id> <out-file>              download a past generation
  tags <file>                                     print the metadata embedded in a file
  cleanup [max-age-hours]                         delete stale temp audio
  backup                                          snapshot the database"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — canto cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let pool = create_pool(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["keys", "add", email, api_key] => cmd_keys_add(&pool, email, api_key, None),
        ["keys", "add", email, api_key, voice] => cmd_keys_add(&pool, email, api_key, Some(voice)),
        ["keys", "list"] => cmd_keys_list(&pool),
        ["keys", "activate", id] => cmd_keys_activate(&pool, id),
        ["keys", "remove", id] => cmd_keys_remove(&pool, id),
        ["generate", text] => cmd_generate(&config, &pool, text, None).await,
        ["generate", text, voice] => cmd_generate(&config, &pool, text, Some(voice)).await,
        ["voices"] => cmd_voices(&config, &pool).await,
        ["history"] => cmd_history(&config, &pool, None).await,
        ["history", "audio", item_id, out] => cmd_history_audio(&config, &pool, item_id, out).await,
        ["history", page_size] => cmd_history(&config, &pool, Some(page_size)).await,
        ["tags", file] => cmd_tags(file),
        ["cleanup"] => cmd_cleanup(&config, None),
        ["cleanup", hours] => cmd_cleanup(&config, Some(hours)),
        ["backup"] => cmd_backup(&config, &pool),
        _ => usage(),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

fn client_for(config: &Config) -> ElevenLabsClient {
    ElevenLabsClient::new(ElevenLabsConfig {
        base_url: config.tts.base_url.clone(),
        timeout: Duration::from_secs(config.tts.timeout_seconds),
        default_model_id: config.tts.model_id.clone(),
    })
    .unwrap_or_else(|e| fail(e))
}

/// Loads the active credential, failing the command when none exists.
fn require_active_key(pool: &DbPool) -> canto_keys::ApiKey {
    let conn = pool.get().unwrap_or_else(|e| fail(e));
    match canto_keys::active_key(&conn) {
        Ok(Some(key)) => key,
        Ok(None) => fail("no active API key configured — run `canto keys activate <id>` first"),
        Err(e) => fail(e),
    }
}

fn cmd_keys_add(pool: &DbPool, email: &str, api_key: &str, voice: Option<&str>) {
    let conn = pool.get().unwrap_or_else(|e| fail(e));
    let key = canto_keys::add_key(&conn, email, api_key, voice).unwrap_or_else(|e| fail(e));
    println!("stored key {} for {} (inactive)", key.id, key.email);
}

fn cmd_keys_list(pool: &DbPool) {
    let conn = pool.get().unwrap_or_else(|e| fail(e));
    let keys = canto_keys::list_keys(&conn).unwrap_or_else(|e| fail(e));
    if keys.is_empty() {
        println!("no keys stored");
        return;
    }
    for key in keys {
        println!(
            "{} {} {} voice={} remaining={}/{} last_used={}",
            key.id,
            if key.active { "[active]" } else { "        " },
            key.email,
            key.default_voice_id.as_deref().unwrap_or("-"),
            key.remaining_characters(),
            key.character_limit,
            key.last_used.as_deref().unwrap_or("never"),
        );
    }
}

fn cmd_keys_activate(pool: &DbPool, id: &str) {
    let id: i64 = id.parse().unwrap_or_else(|_| fail("key id must be a number"));
    let mut conn = pool.get().unwrap_or_else(|e| fail(e));
    canto_keys::activate_key(&mut conn, id).unwrap_or_else(|e| fail(e));
    println!("key {id} is now active");
}

fn cmd_keys_remove(pool: &DbPool, id: &str) {
    let id: i64 = id.parse().unwrap_or_else(|_| fail("key id must be a number"));
    let conn = pool.get().unwrap_or_else(|e| fail(e));
    canto_keys::delete_key(&conn, id).unwrap_or_else(|e| fail(e));
    println!("key {id} removed");
}

async fn cmd_generate(config: &Config, pool: &DbPool, text: &str, voice: Option<&str>) {
    let generator = Generator::new(client_for(config), pool.clone())
        .with_variant_delay(Duration::from_millis(config.tts.variant_delay_ms));

    let mut request = GenerationRequest::new(text);
    request.voice_id = voice.map(str::to_string);
    request.variant_count = config.tts.variant_count;
    request.model_id = config.tts.model_id.clone();

    match generator.generate(&request).await {
        AudioGenerationResult::Success(mut audios) => {
            let repo =
                AudioRepository::new(&config.audio.temp_dir).unwrap_or_else(|e| fail(e));
            let saved = repo.save_all(&mut audios).unwrap_or_else(|e| fail(e));

            let conn = pool.get().unwrap_or_else(|e| fail(e));
            for (audio, entry) in audios.iter().zip(&saved) {
                let guid = uuid::Uuid::new_v4().to_string();
                let checksum = canto_audio::audio_checksum(&entry.path).ok();
                canto_library::upsert_track(
                    &conn,
                    &UpsertTrack {
                        guid: &guid,
                        checksum: checksum.as_deref(),
                        folder: Some(&config.audio.temp_dir),
                        title: Some(&audio.source_text),
                    },
                )
                .unwrap_or_else(|e| fail(e));

                println!(
                    "{} ({})",
                    entry.path.display(),
                    if entry.tagged { "tagged" } else { "untagged" }
                );
            }
        }
        AudioGenerationResult::Error { message, cause } => {
            if let Some(cause) = cause {
                fail(format!("{message} ({cause})"));
            }
            fail(message);
        }
    }
}

async fn cmd_voices(config: &Config, pool: &DbPool) {
    let key = require_active_key(pool);
    let client = client_for(config);
    let voices = client
        .list_voices(&key.api_key)
        .await
        .unwrap_or_else(|e| fail(e));
    for voice in voices {
        println!(
            "{} {} ({})",
            voice.voice_id,
            voice.name,
            voice.category.as_deref().unwrap_or("uncategorized"),
        );
    }
}

async fn cmd_history(config: &Config, pool: &DbPool, page_size: Option<&str>) {
    let page_size = page_size
        .map(|raw| raw.parse().unwrap_or_else(|_| fail("page size must be a number")));

    let key = require_active_key(pool);
    let client = client_for(config);
    let page = client
        .history(
            &key.api_key,
            &HistoryQuery {
                page_size,
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap_or_else(|e| fail(e));

    for item in &page.history {
        println!(
            "{} {} voice={} \"{}\"",
            item.history_item_id,
            item.date_unix,
            item.voice_name.as_deref().unwrap_or("-"),
            item.text.as_deref().unwrap_or(""),
        );
    }
    if page.has_more {
        println!(
            "more available after {}",
            page.last_history_item_id.as_deref().unwrap_or("<unknown>")
        );
    }
}

async fn cmd_history_audio(config: &Config, pool: &DbPool, item_id: &str, out: &str) {
    let key = require_active_key(pool);
    let client = client_for(config);
    let bytes = client
        .history_audio(&key.api_key, item_id)
        .await
        .unwrap_or_else(|e| fail(e));
    std::fs::write(out, &bytes).unwrap_or_else(|e| fail(e));
    println!("wrote {} byte(s) to {out}", bytes.len());
}

fn cmd_tags(file: &str) {
    let path = std::path::Path::new(file);
    match canto_audio::read_tags(path).unwrap_or_else(|e| fail(e)) {
        None => println!("no embedded metadata"),
        Some(bundle) => {
            println!("transcription: {}", bundle.transcription.as_deref().unwrap_or("-"));
            println!("created:       {}", bundle.creation_date.as_deref().unwrap_or("-"));
            println!(
                "duration:      {}",
                bundle
                    .duration_secs
                    .map(|d| format!("{d:.1}s"))
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("guid:          {}", bundle.guid.as_deref().unwrap_or("-"));
            println!("checksum:      {}", bundle.checksum.as_deref().unwrap_or("-"));
            match bundle.params {
                Some(params) => println!(
                    "generated by:  {} voice={} model={}",
                    params.kind,
                    params.str_param("voice_name").unwrap_or("-"),
                    params.str_param("model_id").unwrap_or("-"),
                ),
                None => println!("generated by:  -"),
            }
        }
    }
}

fn cmd_cleanup(config: &Config, hours: Option<&str>) {
    let max_age_hours: u64 = match hours {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|_| fail("max age must be a number of hours")),
        None => config.audio.temp_max_age_hours,
    };

    let repo = AudioRepository::new(&config.audio.temp_dir).unwrap_or_else(|e| fail(e));
    let deleted = repo
        .clear_temp_audios_older_than(Duration::from_secs(max_age_hours * 3600))
        .unwrap_or_else(|e| fail(e));
    println!("deleted {deleted} stale temp file(s)");
}

fn cmd_backup(config: &Config, pool: &DbPool) {
    let conn = pool.get().unwrap_or_else(|e| fail(e));
    let path = canto_db::backup_database(&conn, std::path::Path::new(&config.backup.dir))
        .unwrap_or_else(|e| fail(e));
    let pruned =
        canto_db::prune_backups(std::path::Path::new(&config.backup.dir), config.backup.keep)
            .unwrap_or_else(|e| fail(e));
    println!("snapshot written to {} ({pruned} pruned)", path.display());
}
