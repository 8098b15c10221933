use serde::Serialize;
use tavern_core::config::{AppConfig, LoadOptions};
use tavern_store::{validate_all, CollectionStatus, StoreError};

use crate::commands::{
    build_runtime, open_store, CommandResult, EXIT_CONFIG, EXIT_STORE_INVALID, EXIT_STORE_IO,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
    #[serde(skip)]
    exit_code: u8,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into(), exit_code: 0 }
    }

    fn fail(name: &'static str, details: impl Into<String>, exit_code: u8) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into(), exit_code }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: format!("skipped because {reason}"),
            exit_code: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    /// Exit code of the first failing check, `0` when every check passed.
    fn exit_code(&self) -> u8 {
        self.checks.iter().map(|check| check.exit_code).find(|code| *code != 0).unwrap_or(0)
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = report.exit_code();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.extend(check_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string(), EXIT_CONFIG));
            checks.push(DoctorCheck::skipped("store_readable", "configuration did not load"));
            checks.push(DoctorCheck::skipped("collections_valid", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_store(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match build_runtime("doctor") {
        Ok(runtime) => runtime,
        Err(failure) => {
            return vec![
                DoctorCheck::fail("store_readable", failure.output, failure.exit_code),
                DoctorCheck::skipped("collections_valid", "the async runtime did not start"),
            ];
        }
    };

    let store = open_store(config);
    let path = config.store.path.display().to_string();
    match runtime.block_on(validate_all(&store)) {
        Ok(report) => {
            let readable = if config.store.path.exists() {
                DoctorCheck::pass("store_readable", format!("read `{path}`"))
            } else {
                DoctorCheck::pass("store_readable", format!("`{path}` is absent and will be created"))
            };

            let summary = report
                .collections
                .iter()
                .map(|(key, status)| match status {
                    CollectionStatus::Valid { entries } => format!("{key}: {entries} entries"),
                    CollectionStatus::Absent => format!("{key}: absent"),
                    CollectionStatus::Invalid { reason } => format!("{key}: invalid ({reason})"),
                })
                .collect::<Vec<_>>()
                .join("; ");
            let collections = if report.is_valid() {
                DoctorCheck::pass("collections_valid", summary)
            } else {
                DoctorCheck::fail("collections_valid", summary, EXIT_STORE_INVALID)
            };
            vec![readable, collections]
        }
        Err(error @ StoreError::Io { .. }) => vec![
            DoctorCheck::fail("store_readable", error.to_string(), EXIT_STORE_IO),
            DoctorCheck::skipped("collections_valid", "the store could not be read"),
        ],
        Err(error) => vec![
            DoctorCheck::pass("store_readable", format!("read `{path}`")),
            DoctorCheck::fail("collections_valid", error.to_string(), EXIT_STORE_INVALID),
        ],
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
