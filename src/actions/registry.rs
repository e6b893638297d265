//! Action registry — keyword → action, persisted on every mutation.
//!
//! Insertion order is preserved (substring fallback walks entries in that
//! order). Overwriting an existing keyword keeps its original position.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::actions::model::{Action, normalize_keyword};
use crate::error::RegistryError;
use crate::store::{DocumentStore, keys};

/// Ordered keyword table with O(1) exact lookup.
#[derive(Debug, Default, Clone)]
struct ActionTable {
    entries: Vec<(String, Action)>,
    index: HashMap<String, usize>,
}

impl ActionTable {
    fn get(&self, keyword: &str) -> Option<&Action> {
        self.index.get(keyword).map(|&i| &self.entries[i].1)
    }

    /// Insert or overwrite. Returns the previous action.
    fn upsert(&mut self, keyword: String, action: Action) -> Option<Action> {
        if let Some(&i) = self.index.get(&keyword) {
            return Some(std::mem::replace(&mut self.entries[i].1, action));
        }
        self.index.insert(keyword.clone(), self.entries.len());
        self.entries.push((keyword, action));
        None
    }

    /// Remove a keyword. Returns its former position and action.
    fn remove(&mut self, keyword: &str) -> Option<(usize, Action)> {
        let pos = self.index.remove(keyword)?;
        let (_, action) = self.entries.remove(pos);
        self.reindex();
        Some((pos, action))
    }

    fn insert_at(&mut self, pos: usize, keyword: String, action: Action) {
        let pos = pos.min(self.entries.len());
        self.entries.insert(pos, (keyword, action));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();
    }

    fn to_document(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        for (keyword, action) in &self.entries {
            match serde_json::to_value(action) {
                Ok(value) => {
                    doc.insert(keyword.clone(), value);
                }
                Err(e) => error!(keyword = %keyword, "Failed to serialize action: {}", e),
            }
        }
        serde_json::Value::Object(doc)
    }

    fn from_document(doc: serde_json::Value) -> Self {
        let mut table = Self::default();
        let serde_json::Value::Object(map) = doc else {
            warn!("Action document is not an object, starting empty");
            return table;
        };
        for (keyword, raw) in map {
            match Action::from_document(raw.clone()) {
                Ok(action) => {
                    table.upsert(normalize_keyword(&keyword), action);
                }
                Err(e) => warn!(
                    keyword = %keyword,
                    raw = %raw,
                    "Rejected persisted action with unknown shape: {}",
                    e
                ),
            }
        }
        table
    }
}

/// Registry of keyword-triggered actions.
pub struct ActionRegistry {
    table: RwLock<ActionTable>,
    store: Arc<dyn DocumentStore>,
}

impl ActionRegistry {
    /// Create an empty registry backed by `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            table: RwLock::new(ActionTable::default()),
            store,
        }
    }

    /// Load the persisted action map. Read failures degrade to an empty registry.
    pub async fn load(store: Arc<dyn DocumentStore>) -> Self {
        let table = match store.load(keys::ACTIONS).await {
            Ok(Some(doc)) => ActionTable::from_document(doc),
            Ok(None) => ActionTable::default(),
            Err(e) => {
                error!("Failed to load actions, starting empty: {}", e);
                ActionTable::default()
            }
        };
        info!(count = table.entries.len(), "Actions loaded");
        Self {
            table: RwLock::new(table),
            store,
        }
    }

    /// Register `action` under `keyword`, replacing any existing binding.
    ///
    /// Returns the replaced action. If the store rejects the write, the
    /// in-memory change is rolled back and the error returned.
    pub async fn put(
        &self,
        keyword: &str,
        action: Action,
    ) -> Result<Option<Action>, RegistryError> {
        let keyword = normalize_keyword(keyword);
        let mut table = self.table.write().await;

        let previous = table.upsert(keyword.clone(), action);
        if let Err(e) = self.store.save(keys::ACTIONS, &table.to_document()).await {
            match previous {
                Some(old) => {
                    table.upsert(keyword.clone(), old);
                }
                None => {
                    table.remove(&keyword);
                }
            }
            error!(keyword = %keyword, "Failed to persist action, rolled back: {}", e);
            return Err(e.into());
        }

        info!(keyword = %keyword, replaced = previous.is_some(), "Action registered");
        Ok(previous)
    }

    /// Exact lookup on the normalized keyword.
    pub async fn get(&self, keyword: &str) -> Option<Action> {
        self.table
            .read()
            .await
            .get(&normalize_keyword(keyword))
            .cloned()
    }

    /// Snapshot of every binding in insertion order.
    pub async fn list(&self) -> Vec<(String, Action)> {
        self.table.read().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove a keyword. Fails with `NotFound` if it was never registered.
    pub async fn delete(&self, keyword: &str) -> Result<Action, RegistryError> {
        let keyword = normalize_keyword(keyword);
        let mut table = self.table.write().await;

        let Some((pos, removed)) = table.remove(&keyword) else {
            debug!(keyword = %keyword, "Delete requested for unknown keyword");
            return Err(RegistryError::NotFound { keyword });
        };

        if let Err(e) = self.store.save(keys::ACTIONS, &table.to_document()).await {
            table.insert_at(pos, keyword.clone(), removed);
            error!(keyword = %keyword, "Failed to persist delete, rolled back: {}", e);
            return Err(e.into());
        }

        info!(keyword = %keyword, "Action deleted");
        Ok(removed)
    }

    /// Keywords of API actions whose credential index is `index` or later.
    /// Those are the bindings a positional credential removal shifts.
    pub async fn keywords_with_token_index_from(&self, index: usize) -> Vec<(String, usize)> {
        self.table
            .read()
            .await
            .entries
            .iter()
            .filter_map(|(k, a)| a.token_index().filter(|&i| i >= index).map(|i| (k.clone(), i)))
            .collect()
    }
}
