use tavern_core::config::SeedConfig;
use tavern_core::{Checklists, CollectionKey, CollectionValue, NamedLists};
use tracing::info;

use crate::{CollectionStore, StoreError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub seeded: Vec<CollectionKey>,
    pub skipped: Vec<CollectionKey>,
}

/// Writes configured seed values for collections the store does not hold yet.
/// Existing values are never overwritten.
pub async fn seed_missing(
    store: &CollectionStore,
    seed: &SeedConfig,
) -> Result<SeedOutcome, StoreError> {
    let mut outcome = SeedOutcome::default();

    for key in CollectionKey::ALL {
        let Some(value) = seed_value(seed, key) else {
            continue;
        };

        let guard = store.lock(key).await;
        if guard.load().await?.is_some() {
            outcome.skipped.push(key);
            continue;
        }

        guard.save(&value).await?;
        info!(
            event_name = "store.seed.applied",
            collection = %key,
            entries = value.len(),
            "seeded missing collection"
        );
        outcome.seeded.push(key);
    }

    Ok(outcome)
}

fn seed_value(seed: &SeedConfig, key: CollectionKey) -> Option<CollectionValue> {
    match key {
        CollectionKey::AdventureDeck => seed.adventure_deck.clone().map(CollectionValue::List),
        CollectionKey::Quotes => seed.quotes.clone().map(CollectionValue::List),
        CollectionKey::Names => {
            seed.names.clone().map(|names| CollectionValue::NamedLists(NamedLists(names)))
        }
        CollectionKey::Checklists => seed
            .checklists
            .clone()
            .map(|checklists| CollectionValue::Checklists(Checklists::from(checklists))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionStatus {
    Valid { entries: usize },
    Absent,
    Invalid { reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub collections: Vec<(CollectionKey, CollectionStatus)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = (CollectionKey, &str)> {
        self.collections.iter().filter_map(|(key, status)| match status {
            CollectionStatus::Invalid { reason } => Some((*key, reason.as_str())),
            _ => None,
        })
    }
}

/// Decodes every collection against its declared shape. I/O failures abort;
/// malformed values are reported per collection.
pub async fn validate_all(store: &CollectionStore) -> Result<ValidationReport, StoreError> {
    let mut report = ValidationReport::default();

    for key in CollectionKey::ALL {
        let status = match store.lock(key).await.load().await {
            Ok(Some(value)) => CollectionStatus::Valid { entries: value.len() },
            Ok(None) => CollectionStatus::Absent,
            Err(error @ (StoreError::Decode { .. } | StoreError::Syntax { .. })) => {
                CollectionStatus::Invalid { reason: error.to_string() }
            }
            Err(error) => return Err(error),
        };
        report.collections.push((key, status));
    }

    Ok(report)
}
