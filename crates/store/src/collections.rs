use std::sync::Arc;

use tavern_core::{Checklists, CollectionKey, CollectionValue, NamedLists};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{KeyValueStore, StoreError};

/// Typed access to the four collections over any [`KeyValueStore`].
///
/// Each collection key has its own mutex; a caller holds the key's
/// [`CollectionGuard`] for the whole read-modify-write so two commands (or a
/// command and the scheduled broadcast) never interleave on one key.
pub struct CollectionStore {
    backend: Arc<dyn KeyValueStore>,
    locks: [Mutex<()>; 4],
}

impl CollectionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend, locks: Default::default() }
    }

    pub async fn lock(&self, key: CollectionKey) -> CollectionGuard<'_> {
        let lock = self.locks[lock_slot(key)].lock().await;
        CollectionGuard { key, backend: self.backend.as_ref(), _lock: lock }
    }
}

fn lock_slot(key: CollectionKey) -> usize {
    match key {
        CollectionKey::AdventureDeck => 0,
        CollectionKey::Names => 1,
        CollectionKey::Quotes => 2,
        CollectionKey::Checklists => 3,
    }
}

/// Exclusive handle on one collection key, released on drop.
pub struct CollectionGuard<'a> {
    key: CollectionKey,
    backend: &'a dyn KeyValueStore,
    _lock: MutexGuard<'a, ()>,
}

impl CollectionGuard<'_> {
    pub async fn load(&self) -> Result<Option<CollectionValue>, StoreError> {
        let Some(raw) = self.backend.get(self.key.as_str()).await? else {
            return Ok(None);
        };

        CollectionValue::decode(self.key, &raw)
            .map(Some)
            .map_err(|source| StoreError::Decode { key: self.key, source })
    }

    pub async fn load_list(&self) -> Result<Option<Vec<String>>, StoreError> {
        self.load()
            .await?
            .map(|value| value.into_list(self.key))
            .transpose()
            .map_err(|source| StoreError::Decode { key: self.key, source })
    }

    pub async fn load_named_lists(&self) -> Result<Option<NamedLists>, StoreError> {
        self.load()
            .await?
            .map(|value| value.into_named_lists(self.key))
            .transpose()
            .map_err(|source| StoreError::Decode { key: self.key, source })
    }

    /// An absent checklists key reads as an empty mapping.
    pub async fn load_checklists(&self) -> Result<Checklists, StoreError> {
        let loaded = self
            .load()
            .await?
            .map(|value| value.into_checklists(self.key))
            .transpose()
            .map_err(|source| StoreError::Decode { key: self.key, source })?;
        Ok(loaded.unwrap_or_default())
    }

    pub async fn save(&self, value: &CollectionValue) -> Result<(), StoreError> {
        let raw =
            value.encode(self.key).map_err(|source| StoreError::Decode { key: self.key, source })?;
        self.backend.set(self.key.as_str(), &raw).await?;
        debug!(
            event_name = "store.collection.saved",
            collection = %self.key,
            bytes = raw.len(),
            "collection persisted"
        );
        Ok(())
    }
}
