//! Access gate — allow-list deciding who may trigger automatic replies.
//!
//! Admin commands never pass through here; the host authorizes those.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{AccessError, ValidationError};
use crate::store::{DocumentStore, keys};

fn default_enabled() -> bool {
    true
}

/// Persisted gate state. `ids` is ordered for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GateState {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default, deserialize_with = "deserialize_ids")]
    ids: Vec<String>,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            enabled: true,
            ids: Vec::new(),
        }
    }
}

/// Platform ids may arrive as numbers or strings; store them as strings.
fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    let mut ids: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        let id = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let id = id.trim().to_string();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Snapshot of the gate for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub enabled: bool,
    pub ids: Vec<String>,
}

/// Allow-list of sender ids with an on/off switch.
pub struct AccessGate {
    state: RwLock<GateState>,
    store: Arc<dyn DocumentStore>,
}

impl AccessGate {
    /// Create an enabled, empty gate backed by `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            state: RwLock::new(GateState::default()),
            store,
        }
    }

    /// Load persisted state. Failures degrade to an enabled, empty gate.
    pub async fn load(store: Arc<dyn DocumentStore>) -> Self {
        let state = match store.load(keys::ACCESS).await {
            Ok(Some(doc)) => serde_json::from_value(doc).unwrap_or_else(|e| {
                warn!("Malformed access list, starting empty: {}", e);
                GateState::default()
            }),
            Ok(None) => GateState::default(),
            Err(e) => {
                error!("Failed to load access list, starting empty: {}", e);
                GateState::default()
            }
        };
        info!(enabled = state.enabled, count = state.ids.len(), "Access list loaded");
        Self {
            state: RwLock::new(state),
            store,
        }
    }

    /// Whether `sender_id` may trigger automatic replies.
    pub async fn allows(&self, sender_id: &str) -> bool {
        let state = self.state.read().await;
        if !state.enabled {
            return true;
        }
        let allowed = state.ids.iter().any(|id| id == sender_id.trim());
        if !allowed {
            debug!(sender = %sender_id, "Sender not in allow-list");
        }
        allowed
    }

    /// Add a sender. Returns `false` if it was already present.
    pub async fn add(&self, sender_id: &str) -> Result<bool, AccessError> {
        let id = require_id(sender_id)?;
        self.mutate(|state| {
            if state.ids.iter().any(|existing| existing == &id) {
                return false;
            }
            state.ids.push(id.clone());
            true
        })
        .await
    }

    /// Remove a sender. Fails with `NotFound` if absent.
    pub async fn remove(&self, sender_id: &str) -> Result<(), AccessError> {
        let id = require_id(sender_id)?;
        let removed = self
            .mutate(|state| {
                let before = state.ids.len();
                state.ids.retain(|existing| existing != &id);
                state.ids.len() != before
            })
            .await?;
        if removed {
            Ok(())
        } else {
            Err(AccessError::NotFound { id })
        }
    }

    /// Flip the gate. Returns the new `enabled` value.
    pub async fn toggle(&self) -> Result<bool, AccessError> {
        let mut enabled = false;
        self.mutate(|state| {
            state.enabled = !state.enabled;
            enabled = state.enabled;
            true
        })
        .await?;
        Ok(enabled)
    }

    /// Set the gate explicitly. Returns `false` if it already had that value.
    pub async fn set_enabled(&self, enabled: bool) -> Result<bool, AccessError> {
        self.mutate(|state| {
            if state.enabled == enabled {
                return false;
            }
            state.enabled = enabled;
            true
        })
        .await
    }

    pub async fn snapshot(&self) -> GateSnapshot {
        let state = self.state.read().await;
        GateSnapshot {
            enabled: state.enabled,
            ids: state.ids.clone(),
        }
    }

    /// Apply `change` and persist if it reports a modification. The write
    /// lock is held across the save; a failed save restores the old state.
    async fn mutate<F>(&self, change: F) -> Result<bool, AccessError>
    where
        F: FnOnce(&mut GateState) -> bool,
    {
        let mut state = self.state.write().await;
        let before = state.clone();
        if !change(&mut state) {
            return Ok(false);
        }

        let doc = serde_json::to_value(&*state).map_err(|e| crate::error::StoreError::Serialization {
            key: keys::ACCESS.to_string(),
            reason: e.to_string(),
        })?;
        if let Err(e) = self.store.save(keys::ACCESS, &doc).await {
            *state = before;
            error!("Failed to persist access list, rolled back: {}", e);
            return Err(e.into());
        }

        info!(enabled = state.enabled, count = state.ids.len(), "Access list updated");
        Ok(true)
    }
}

fn require_id(sender_id: &str) -> Result<String, AccessError> {
    let id = sender_id.trim();
    if id.is_empty() {
        return Err(AccessError::Invalid(ValidationError::EmptyField("sender id".into())));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn gate() -> (AccessGate, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AccessGate::new(store.clone()), store)
    }

    #[tokio::test]
    async fn enabled_gate_only_allows_listed_ids() {
        let (gate, _) = gate();
        gate.add("9").await.unwrap();
        assert!(gate.allows("9").await);
        assert!(!gate.allows("123").await);
    }

    #[tokio::test]
    async fn disabled_gate_allows_everyone() {
        let (gate, _) = gate();
        assert!(!gate.toggle().await.unwrap());
        assert!(gate.allows("anyone").await);
    }

    #[tokio::test]
    async fn add_is_idempotent_and_persists() {
        let (gate, store) = gate();
        assert!(gate.add(" 42 ").await.unwrap());
        assert!(!gate.add("42").await.unwrap());
        assert_eq!(
            store.get(keys::ACCESS).await,
            Some(json!({"enabled": true, "ids": ["42"]}))
        );
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let (gate, _) = gate();
        assert!(matches!(
            gate.remove("nobody").await,
            Err(AccessError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn set_enabled_reports_change() {
        let (gate, _) = gate();
        assert!(!gate.set_enabled(true).await.unwrap());
        assert!(gate.set_enabled(false).await.unwrap());
        assert!(!gate.snapshot().await.enabled);
    }

    #[tokio::test]
    async fn numeric_ids_load_as_strings() {
        let store = Arc::new(MemoryStore::new());
        store.insert(keys::ACCESS, json!({"ids": [123, "abc", 123]})).await;
        let gate = AccessGate::load(store).await;
        let snap = gate.snapshot().await;
        assert!(snap.enabled);
        assert_eq!(snap.ids, vec!["123", "abc"]);
        assert!(gate.allows("123").await);
    }

    #[tokio::test]
    async fn failed_persist_restores_state() {
        let (gate, store) = gate();
        gate.add("1").await.unwrap();
        store.set_fail_writes(true);

        assert!(gate.add("2").await.is_err());
        assert!(gate.toggle().await.is_err());
        assert!(gate.remove("1").await.is_err());

        assert_eq!(
            gate.snapshot().await,
            GateSnapshot {
                enabled: true,
                ids: vec!["1".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn blank_id_is_rejected() {
        let (gate, _) = gate();
        assert!(matches!(gate.add("  ").await, Err(AccessError::Invalid(_))));
    }
}
