use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use tavern_core::config::AppConfig;
use tavern_core::CollectionKey;
use toml::Value;

use crate::commands::{load_config, CommandResult};

struct FieldLine {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    let seeded = CollectionKey::ALL
        .into_iter()
        .filter(|key| seed_configured(&config, *key))
        .map(CollectionKey::as_str)
        .collect::<Vec<_>>();
    let seeded = if seeded.is_empty() { "<none>".to_string() } else { seeded.join(", ") };
    lines.push(format!("- seed = {seeded}"));

    CommandResult::success("config", lines.join("\n"))
}

fn effective_fields(config: &AppConfig) -> Vec<FieldLine> {
    vec![
        FieldLine {
            key: "discord.token",
            env_keys: &["TAVERN_DISCORD_TOKEN"],
            value: config
                .discord
                .token
                .as_ref()
                .map(|token| redact_token(token.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        FieldLine {
            key: "discord.guild",
            env_keys: &["TAVERN_DISCORD_GUILD"],
            value: config.discord.guild.clone().unwrap_or_else(|| "<unset>".to_string()),
        },
        FieldLine {
            key: "discord.broadcast_channel_id",
            env_keys: &["TAVERN_DISCORD_BROADCAST_CHANNEL_ID"],
            value: config
                .discord
                .broadcast_channel_id
                .clone()
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        FieldLine {
            key: "discord.command_prefix",
            env_keys: &["TAVERN_DISCORD_COMMAND_PREFIX"],
            value: config.discord.command_prefix.clone(),
        },
        FieldLine {
            key: "store.path",
            env_keys: &["TAVERN_STORE_PATH"],
            value: config.store.path.display().to_string(),
        },
        FieldLine {
            key: "schedule.daily_quote_enabled",
            env_keys: &["TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED"],
            value: config.schedule.daily_quote_enabled.to_string(),
        },
        FieldLine {
            key: "schedule.interval_secs",
            env_keys: &["TAVERN_SCHEDULE_INTERVAL_SECS"],
            value: config.schedule.interval_secs.to_string(),
        },
        FieldLine {
            key: "transport.mode",
            env_keys: &["TAVERN_TRANSPORT_MODE"],
            value: format!("{:?}", config.transport.mode),
        },
        FieldLine {
            key: "logging.level",
            env_keys: &["TAVERN_LOGGING_LEVEL", "TAVERN_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        FieldLine {
            key: "logging.format",
            env_keys: &["TAVERN_LOGGING_FORMAT", "TAVERN_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn seed_configured(config: &AppConfig, key: CollectionKey) -> bool {
    let seed = &config.seed;
    match key {
        CollectionKey::AdventureDeck => seed.adventure_deck.is_some(),
        CollectionKey::Names => seed.names.is_some(),
        CollectionKey::Quotes => seed.quotes.is_some(),
        CollectionKey::Checklists => seed.checklists.is_some(),
    }
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("TAVERN_CONFIG").filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path)).filter(|path| path.exists());
    }

    ["tavern.toml", "config/tavern.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

/// Blank values are ignored by the loader, so they do not count as a source.
fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of long tokens so operators can tell
/// tokens apart without exposing them.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if trimmed.len() > 12 => format!("{prefix}***"),
        _ => "<redacted>".to_string(),
    }
}
