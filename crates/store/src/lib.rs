//! Persisted collections for tavern.
//!
//! - **`KeyValueStore`** - raw `key -> string` persistence with whole-value replacement
//! - **`EnvFileStore`** - flat `KEY='value'` file, rewritten atomically on every `set`
//! - **`InMemoryStore`** - process-local store for tests and dry runs
//! - **`CollectionStore`** - typed, per-key locked read-modify-write over any backend
//!
//! ```text
//! handler → CollectionStore (lock key) → KeyValueStore::get / set → file
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use tavern_core::{CollectionKey, CommandError, DomainError};
use thiserror::Error;

pub mod collections;
pub mod env_file;
pub mod memory;
pub mod seed;

pub use collections::{CollectionGuard, CollectionStore};
pub use env_file::EnvFileStore;
pub use memory::InMemoryStore;
pub use seed::{seed_missing, validate_all, CollectionStatus, SeedOutcome, ValidationReport};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file `{path}` could not be {action}: {source}")]
    Io { path: PathBuf, action: &'static str, source: std::io::Error },
    #[error("store file `{path}` line {line} is not a `KEY=VALUE` entry")]
    Syntax { path: PathBuf, line: usize },
    #[error("stored value for `{key}` is invalid: {source}")]
    Decode { key: CollectionKey, source: DomainError },
}

impl From<StoreError> for CommandError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value.to_string())
    }
}

/// Raw persistence contract. `set` must be durable before it returns and must
/// never leave a partially written value observable to `get`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
