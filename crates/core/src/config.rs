use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub store: StoreConfig,
    pub schedule: ScheduleConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
    pub seed: SeedConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: Option<SecretString>,
    pub guild: Option<String>,
    pub broadcast_channel_id: Option<String>,
    pub command_prefix: String,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub daily_quote_enabled: bool,
    pub interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub mode: TransportMode,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Initial collection values written to the store for keys it does not hold yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub adventure_deck: Option<Vec<String>>,
    #[serde(default)]
    pub names: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub quotes: Option<Vec<String>>,
    #[serde(default)]
    pub checklists: Option<BTreeMap<String, Vec<String>>>,
}

impl SeedConfig {
    pub fn is_empty(&self) -> bool {
        self.adventure_deck.is_none()
            && self.names.is_none()
            && self.quotes.is_none()
            && self.checklists.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Console,
    Noop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub discord_token: Option<String>,
    pub broadcast_channel_id: Option<String>,
    pub command_prefix: Option<String>,
    pub daily_quote_enabled: Option<bool>,
    pub schedule_interval_secs: Option<u64>,
    pub transport_mode: Option<TransportMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                token: None,
                guild: None,
                broadcast_channel_id: None,
                command_prefix: "!".to_string(),
            },
            store: StoreConfig { path: PathBuf::from("tavern.env") },
            schedule: ScheduleConfig { daily_quote_enabled: true, interval_secs: 24 * 60 * 60 },
            transport: TransportConfig { mode: TransportMode::Console },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            seed: SeedConfig::default(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "noop" => Ok(Self::Noop),
            other => Err(ConfigError::Validation(format!(
                "unsupported transport mode `{other}` (expected console|noop)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let env_path = read_env("TAVERN_CONFIG").map(PathBuf::from);
        let require_file =
            options.require_file || (options.config_path.is_none() && env_path.is_some());
        let explicit_path = options.config_path.or(env_path);
        let maybe_path = resolve_config_path(explicit_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if require_file {
            let expected = explicit_path.unwrap_or_else(|| PathBuf::from("tavern.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn schedule_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.schedule.interval_secs)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(discord_token_value) = discord.token {
                self.discord.token = Some(secret_value(discord_token_value));
            }
            if let Some(guild) = discord.guild {
                self.discord.guild = Some(guild);
            }
            if let Some(broadcast_channel_id) = discord.broadcast_channel_id {
                self.discord.broadcast_channel_id = Some(broadcast_channel_id);
            }
            if let Some(command_prefix) = discord.command_prefix {
                self.discord.command_prefix = command_prefix;
            }
        }

        if let Some(store) = patch.store {
            if let Some(path) = store.path {
                self.store.path = path;
            }
        }

        if let Some(schedule) = patch.schedule {
            if let Some(enabled) = schedule.daily_quote_enabled {
                self.schedule.daily_quote_enabled = enabled;
            }
            if let Some(interval_secs) = schedule.interval_secs {
                self.schedule.interval_secs = interval_secs;
            }
        }

        if let Some(transport) = patch.transport {
            if let Some(mode) = transport.mode {
                self.transport.mode = mode;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(seed) = patch.seed {
            self.seed = seed;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TAVERN_DISCORD_TOKEN") {
            self.discord.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("TAVERN_DISCORD_GUILD") {
            self.discord.guild = Some(value);
        }
        if let Some(value) = read_env("TAVERN_DISCORD_BROADCAST_CHANNEL_ID") {
            self.discord.broadcast_channel_id = Some(value);
        }
        if let Some(value) = read_env("TAVERN_DISCORD_COMMAND_PREFIX") {
            self.discord.command_prefix = value;
        }

        if let Some(value) = read_env("TAVERN_STORE_PATH") {
            self.store.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED") {
            self.schedule.daily_quote_enabled =
                parse_bool("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("TAVERN_SCHEDULE_INTERVAL_SECS") {
            self.schedule.interval_secs = parse_u64("TAVERN_SCHEDULE_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("TAVERN_TRANSPORT_MODE") {
            self.transport.mode = value.parse()?;
        }

        let log_level = read_env("TAVERN_LOGGING_LEVEL").or_else(|| read_env("TAVERN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TAVERN_LOGGING_FORMAT").or_else(|| read_env("TAVERN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(store_path) = overrides.store_path {
            self.store.path = store_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(discord_token) = overrides.discord_token {
            self.discord.token = Some(secret_value(discord_token));
        }
        if let Some(broadcast_channel_id) = overrides.broadcast_channel_id {
            self.discord.broadcast_channel_id = Some(broadcast_channel_id);
        }
        if let Some(command_prefix) = overrides.command_prefix {
            self.discord.command_prefix = command_prefix;
        }
        if let Some(enabled) = overrides.daily_quote_enabled {
            self.schedule.daily_quote_enabled = enabled;
        }
        if let Some(interval_secs) = overrides.schedule_interval_secs {
            self.schedule.interval_secs = interval_secs;
        }
        if let Some(mode) = overrides.transport_mode {
            self.transport.mode = mode;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_store(&self.store)?;
        validate_schedule(&self.schedule, &self.discord)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tavern.toml"), PathBuf::from("config/tavern.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if let Some(token) = &discord.token {
        let token = token.expose_secret();
        if token.trim().is_empty() || token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "discord.token must be a single non-blank value without whitespace. Copy it from the Developer Portal > Your App > Bot > Token".to_string(),
            ));
        }
    }

    if let Some(channel_id) = &discord.broadcast_channel_id {
        if channel_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.broadcast_channel_id must not be blank when set".to_string(),
            ));
        }
    }

    let prefix = discord.command_prefix.as_str();
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.command_prefix must be non-empty and contain no whitespace".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("store.path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_schedule(schedule: &ScheduleConfig, discord: &DiscordConfig) -> Result<(), ConfigError> {
    if schedule.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "schedule.interval_secs must be greater than zero".to_string(),
        ));
    }

    if schedule.daily_quote_enabled && discord.broadcast_channel_id.is_none() {
        return Err(ConfigError::Validation(
            "discord.broadcast_channel_id is required while schedule.daily_quote_enabled is true (set TAVERN_DISCORD_BROADCAST_CHANNEL_ID or disable the broadcast)".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    store: Option<StorePatch>,
    schedule: Option<SchedulePatch>,
    transport: Option<TransportPatch>,
    logging: Option<LoggingPatch>,
    seed: Option<SeedConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    guild: Option<String>,
    broadcast_channel_id: Option<String>,
    command_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulePatch {
    daily_quote_enabled: Option<bool>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TransportPatch {
    mode: Option<TransportMode>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, TransportMode};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const TAVERN_VARS: &[&str] = &[
        "TAVERN_CONFIG",
        "TAVERN_DISCORD_TOKEN",
        "TAVERN_DISCORD_BROADCAST_CHANNEL_ID",
        "TAVERN_STORE_PATH",
        "TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED",
        "TAVERN_SCHEDULE_INTERVAL_SECS",
        "TAVERN_LOG_LEVEL",
        "TAVERN_LOG_FORMAT",
        "TEST_TAVERN_TOKEN",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn broadcast_disabled() -> ConfigOverrides {
        ConfigOverrides { daily_quote_enabled: Some(false), ..ConfigOverrides::default() }
    }

    #[test]
    fn file_load_supports_env_interpolation_and_seed_tables() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);
        env::set_var("TEST_TAVERN_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tavern.toml");
            fs::write(
                &path,
                r#"
[discord]
token = "${TEST_TAVERN_TOKEN}"
broadcast_channel_id = "1234"

[seed]
quotes = ["Roll for initiative."]
names = { name = ["Ada"], surname = ["Stone"] }
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.token.as_ref().map(|token| token.expose_secret().to_string())
                    == Some("token-from-env".to_string()),
                "token should be interpolated from the environment",
            )?;
            ensure(
                config.seed.quotes == Some(vec!["Roll for initiative.".to_string()]),
                "quote seed should be read from the file",
            )?;
            ensure(
                config.seed.names.as_ref().and_then(|names| names.get("surname")).is_some(),
                "name seed should keep its categories",
            )?;
            ensure(config.seed.adventure_deck.is_none(), "unset seeds stay unset")?;
            Ok(())
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        env::set_var("TAVERN_DISCORD_BROADCAST_CHANNEL_ID", "42");
        env::set_var("TAVERN_LOG_LEVEL", "warn");
        env::set_var("TAVERN_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        env::set_var("TAVERN_STORE_PATH", "from-env.env");
        env::set_var("TAVERN_SCHEDULE_INTERVAL_SECS", "60");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tavern.toml");
            fs::write(
                &path,
                r#"
[store]
path = "from-file.env"

[schedule]
interval_secs = 3600
daily_quote_enabled = false

[transport]
mode = "noop"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    store_path: Some("from-override.env".into()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.store.path.to_str() == Some("from-override.env"),
                "override store path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.schedule.interval_secs == 60, "env interval should win over file")?;
            ensure(!config.schedule.daily_quote_enabled, "file should disable the broadcast")?;
            ensure(config.transport.mode == TransportMode::Noop, "file transport mode applies")?;
            Ok(())
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn broadcast_requires_destination_channel() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("discord.broadcast_channel_id")
            );
            ensure(has_message, "validation failure should mention the broadcast channel")
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);
        env::set_var("TAVERN_SCHEDULE_INTERVAL_SECS", "daily");

        let result = (|| -> Result<(), String> {
            let loaded = AppConfig::load(LoadOptions {
                overrides: broadcast_disabled(),
                ..LoadOptions::default()
            });
            ensure(
                matches!(loaded, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "TAVERN_SCHEDULE_INTERVAL_SECS"),
                "non-numeric interval should be rejected with the env key",
            )
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn config_path_from_env_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let missing = dir.path().join("missing.toml");
            env::set_var("TAVERN_CONFIG", &missing);
            let loaded = AppConfig::load(LoadOptions {
                overrides: broadcast_disabled(),
                ..LoadOptions::default()
            });
            ensure(
                matches!(loaded, Err(ConfigError::MissingConfigFile(ref path)) if *path == missing),
                "a missing TAVERN_CONFIG file should be reported",
            )?;

            let present = dir.path().join("tavern.toml");
            fs::write(&present, "[discord]\ncommand_prefix = \"?\"\n").map_err(|err| err.to_string())?;
            env::set_var("TAVERN_CONFIG", &present);
            let config = AppConfig::load(LoadOptions {
                overrides: broadcast_disabled(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.discord.command_prefix == "?", "file named by TAVERN_CONFIG is read")
        })();

        clear_vars(TAVERN_VARS);
        result
    }

    #[test]
    fn zero_interval_and_blank_prefix_fail_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        let zero_interval = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                schedule_interval_secs: Some(0),
                ..broadcast_disabled()
            },
            ..LoadOptions::default()
        });
        ensure(
            matches!(zero_interval, Err(ConfigError::Validation(ref message)) if message.contains("schedule.interval_secs")),
            "zero interval should be rejected",
        )?;

        let spaced_prefix = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                command_prefix: Some("! ".to_string()),
                ..broadcast_disabled()
            },
            ..LoadOptions::default()
        });
        ensure(
            matches!(spaced_prefix, Err(ConfigError::Validation(ref message)) if message.contains("discord.command_prefix")),
            "prefix with whitespace should be rejected",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TAVERN_VARS);

        env::set_var("TAVERN_DISCORD_TOKEN", "super-secret-token-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: broadcast_disabled(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-token-value"),
                "debug output should not contain the bot token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.discord.command_prefix == "!", "default prefix should be `!`")?;
            Ok(())
        })();

        clear_vars(TAVERN_VARS);
        result
    }
}
