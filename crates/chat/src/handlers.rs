use std::sync::Arc;

use async_trait::async_trait;
use tavern_core::{pick_one, CollectionKey, CollectionValue, CommandError};
use tavern_store::CollectionStore;
use tracing::info;

use crate::commands::{ChecklistAction, CollectionCommandService};
use crate::replies;

/// Uniform pick from a list collection, read under the key's lock.
pub async fn random_pick(store: &CollectionStore, key: CollectionKey) -> Result<String, CommandError> {
    let guard = store.lock(key).await;
    let items = guard.load_list().await?.unwrap_or_default();

    pick_one(&items, &mut rand::thread_rng())
        .map(str::to_owned)
        .ok_or_else(|| CommandError::NotFound(format!("`{key}` has no entries yet")))
}

/// Command service backed by the persisted collections.
#[derive(Clone)]
pub struct StoreCommandService {
    store: Arc<CollectionStore>,
}

impl StoreCommandService {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    async fn add_quote(&self, text: String) -> Result<String, CommandError> {
        let guard = self.store.lock(CollectionKey::Quotes).await;
        let mut quotes = guard.load_list().await?.unwrap_or_default();
        quotes.push(text.clone());
        let total = quotes.len();
        guard.save(&CollectionValue::List(quotes)).await?;

        info!(event_name = "collection.quote.added", total, "quote appended");
        Ok(replies::new_quote(&text))
    }

    async fn list_checklists(&self) -> Result<String, CommandError> {
        let checklists =
            self.store.lock(CollectionKey::Checklists).await.load_checklists().await?;
        Ok(replies::checklist_index(checklists.names()))
    }
}

#[async_trait]
impl CollectionCommandService for StoreCommandService {
    async fn adventure_card(&self) -> Result<String, CommandError> {
        random_pick(&self.store, CollectionKey::AdventureDeck).await
    }

    async fn name(&self) -> Result<String, CommandError> {
        let names = self
            .store
            .lock(CollectionKey::Names)
            .await
            .load_named_lists()
            .await?
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let mut pick = |category: &str| {
            names
                .category(category)
                .and_then(|pool| pick_one(pool, &mut rng))
                .map(str::to_owned)
                .ok_or_else(|| CommandError::NotFound(format!("`names` has no `{category}` entries")))
        };
        let first = pick("name")?;
        let last = pick("surname")?;
        Ok(replies::full_name(&first, &last))
    }

    async fn quote(&self, text: Option<String>) -> Result<String, CommandError> {
        match text {
            Some(text) => self.add_quote(text).await,
            None => random_pick(&self.store, CollectionKey::Quotes).await,
        }
    }

    async fn checklist(
        &self,
        name: Option<String>,
        action: ChecklistAction,
    ) -> Result<String, CommandError> {
        let Some(name) = name else {
            return self.list_checklists().await;
        };
        if name.trim().is_empty() {
            return Err(CommandError::Validation("checklist name must not be empty".to_owned()));
        }

        let guard = self.store.lock(CollectionKey::Checklists).await;
        let mut checklists = guard.load_checklists().await?;

        // A new checklist is persisted before the action is evaluated.
        if checklists.ensure(&name) {
            guard.save(&CollectionValue::Checklists(checklists.clone())).await?;
            info!(event_name = "collection.checklist.created", checklist = %name, "checklist created");
        }

        match action {
            ChecklistAction::Show => {
                Ok(replies::checklist_show(&name, checklists.items(&name).unwrap_or_default()))
            }
            ChecklistAction::Add(items) => {
                let current = checklists.add_items(&name, &items)?.to_vec();
                if !items.is_empty() {
                    guard.save(&CollectionValue::Checklists(checklists)).await?;
                }
                Ok(replies::checklist_added(&current))
            }
            ChecklistAction::Remove(positions) => {
                let remaining = checklists.remove_positions(&name, &positions)?.to_vec();
                guard.save(&CollectionValue::Checklists(checklists)).await?;
                Ok(replies::checklist_removed(&remaining))
            }
            ChecklistAction::Delete => {
                checklists.delete(&name);
                guard.save(&CollectionValue::Checklists(checklists)).await?;
                info!(event_name = "collection.checklist.deleted", checklist = %name, "checklist deleted");
                Ok(replies::checklist_deleted())
            }
        }
    }
}
