//! `DocumentStore` trait — the single async interface for persistence.
//!
//! Every persisted structure is one JSON document addressed by a key.

use async_trait::async_trait;

use crate::error::StoreError;

/// Well-known document keys.
pub mod keys {
    /// Keyword → action map.
    pub const ACTIONS: &str = "custom_command_config";
    /// Ordered credential list `{tokens: [...]}`.
    pub const TOKENS: &str = "api_tokens";
    /// Legacy single-slot token `{token: "..."}`.
    pub const LEGACY_TOKEN: &str = "api_token";
    /// Access gate `{enabled, ids: [...]}`.
    pub const ACCESS: &str = "whitelist";
}

/// Backend-agnostic key-value document store.
///
/// `save` must not return until the document is durable, so callers can
/// treat `Ok(())` as "the store reflects this state".
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document. `Ok(None)` means it was never written.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Replace a document.
    async fn save(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError>;
}
