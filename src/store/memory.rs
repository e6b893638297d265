//! In-process document store, used by tests and embedders without a disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::traits::DocumentStore;

/// Documents kept in a map. Writes can be switched to fail.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, serde_json::Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a document without going through `save`.
    pub async fn insert(&self, key: &str, doc: serde_json::Value) {
        self.docs.write().await.insert(key.to_string(), doc);
    }

    /// Current raw document, if any.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.docs.read().await.get(key).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.get(key).await)
    }

    async fn save(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("write to {key} rejected")));
        }
        self.docs.write().await.insert(key.to_string(), doc.clone());
        Ok(())
    }
}
