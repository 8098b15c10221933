use tavern_core::CollectionKey;
use tavern_store::{seed_missing, validate_all, StoreError};

use crate::commands::{build_runtime, load_config, open_store, CommandResult, EXIT_STORE_INVALID};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    if config.seed.is_empty() {
        return CommandResult::success("seed", "no [seed] values configured; nothing to write");
    }

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = open_store(&config);
    let result = runtime.block_on(async {
        let outcome = seed_missing(&store, &config.seed).await?;
        let report = validate_all(&store).await?;
        Ok::<_, StoreError>((outcome, report))
    });

    let (outcome, report) = match result {
        Ok(done) => done,
        Err(error) => return CommandResult::store_failure("seed", &error),
    };

    if !report.is_valid() {
        let failures = report
            .failures()
            .map(|(key, reason)| format!("{key}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");
        return CommandResult::failure(
            "seed",
            "store_validation",
            format!("store holds invalid collections: {failures}"),
            EXIT_STORE_INVALID,
        );
    }

    CommandResult::success(
        "seed",
        format!(
            "seeded [{}]; already present [{}] in `{}`",
            join_keys(&outcome.seeded),
            join_keys(&outcome.skipped),
            config.store.path.display()
        ),
    )
}

fn join_keys(keys: &[CollectionKey]) -> String {
    keys.iter().map(|key| key.as_str()).collect::<Vec<_>>().join(", ")
}
