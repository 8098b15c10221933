use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tavern_cli::commands::{config, doctor, seed};

const SEED_TOML: &str = r#"
[seed]
quotes = ["Roll for initiative."]
adventure_deck = ["Ambush!"]
names = { name = ["Ada"], surname = ["Stone"] }
"#;

#[test]
fn config_reports_sources_and_redacts_the_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    with_env(
        &[
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_DISCORD_TOKEN", "MTA5ODc2NTQzMjEw.secret.part"),
            ("TAVERN_DISCORD_BROADCAST_CHANNEL_ID", "4242"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config to load");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "config");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("- discord.token = MTA5*** (source: env (TAVERN_DISCORD_TOKEN))"));
            assert!(message.contains("- discord.command_prefix = ! (source: default)"));
            assert!(message.contains("- seed = <none>"));
            assert!(!message.contains("secret.part"));
        },
    );
}

#[test]
fn config_treats_blank_env_values_as_unset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    with_env(
        &[
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_DISCORD_COMMAND_PREFIX", "   "),
            ("TAVERN_LOG_LEVEL", ""),
            ("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", "false"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config to load: {}", result.output);

            let message = parse_payload(&result.output)["message"].as_str().unwrap_or_default().to_owned();
            assert!(message.contains("- discord.command_prefix = ! (source: default)"));
            assert!(message.contains("- logging.level = info (source: default)"));
            assert!(message.contains("- store.path = "));
            assert!(message.contains("(source: env (TAVERN_STORE_PATH))"));
        },
    );
}

#[test]
fn config_returns_config_failure_without_broadcast_channel() {
    with_env(&[], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_fills_absent_collections_and_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    let config_file = dir.path().join("tavern.toml");
    fs::write(&config_file, SEED_TOML).expect("write config");
    fs::write(&store, "discord_token='keep'\nquotes='[\"already here\"]'\n").expect("write store");

    with_env(
        &[
            ("TAVERN_CONFIG", path_str(&config_file)),
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", "false"),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected seed success: {}", first.output);
            let message = parse_payload(&first.output)["message"].as_str().unwrap_or_default().to_owned();
            assert!(message.starts_with("seeded [adventure_deck, names]; already present [quotes]"));

            let contents = fs::read_to_string(&store).expect("read store");
            assert!(contents.starts_with("discord_token='keep'\nquotes='[\"already here\"]'\n"));
            assert!(contents.contains("adventure_deck='[\"Ambush!\"]'"));

            let second = seed::run();
            assert_eq!(second.exit_code, 0);
            let message = parse_payload(&second.output)["message"].as_str().unwrap_or_default().to_owned();
            assert!(message.starts_with("seeded []; already present [adventure_deck, names, quotes]"));
        },
    );
}

#[test]
fn seed_without_seed_tables_is_a_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    with_env(
        &[
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", "false"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0);
            assert_eq!(parse_payload(&result.output)["status"], "ok");
            assert!(!store.exists(), "no-op seed must not create the store file");
        },
    );
}

#[test]
fn doctor_passes_on_a_fresh_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    with_env(
        &[
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", "false"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0, "unexpected doctor output: {}", result.output);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "pass");
            assert_eq!(report["checks"].as_array().map(Vec::len), Some(3));
        },
    );
}

#[test]
fn doctor_flags_malformed_collections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("tavern.env");
    fs::write(&store, "checklists='[\"not\",\"a\",\"mapping\"]'\n").expect("write store");
    with_env(
        &[
            ("TAVERN_STORE_PATH", path_str(&store)),
            ("TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED", "false"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 5);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "fail");
            let collections = &report["checks"][2];
            assert_eq!(collections["name"], "collections_valid");
            assert_eq!(collections["status"], "fail");
            assert!(collections["details"].as_str().unwrap_or_default().contains("checklists: invalid"));

            let human = doctor::run(false);
            assert!(human.output.contains("- [fail] collections_valid:"));
        },
    );
}

#[test]
fn doctor_skips_store_checks_when_config_fails() {
    with_env(&[("TAVERN_SCHEDULE_INTERVAL_SECS", "0")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 2);

        let report = parse_payload(&result.output);
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are utf-8")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TAVERN_CONFIG",
        "TAVERN_DISCORD_TOKEN",
        "TAVERN_DISCORD_GUILD",
        "TAVERN_DISCORD_BROADCAST_CHANNEL_ID",
        "TAVERN_DISCORD_COMMAND_PREFIX",
        "TAVERN_STORE_PATH",
        "TAVERN_SCHEDULE_DAILY_QUOTE_ENABLED",
        "TAVERN_SCHEDULE_INTERVAL_SECS",
        "TAVERN_TRANSPORT_MODE",
        "TAVERN_LOGGING_LEVEL",
        "TAVERN_LOGGING_FORMAT",
        "TAVERN_LOG_LEVEL",
        "TAVERN_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_fn));

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
}
