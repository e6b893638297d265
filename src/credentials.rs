//! Credential pool — ordered bearer tokens addressed by position.
//!
//! Positions are the only identity. Removing an entry shifts every later
//! index down by one; callers that stored an index must re-check it.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::{CredentialError, Error, StoreError, ValidationError};
use crate::store::{DocumentStore, keys};

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Pool entry at this position.
    Pool(usize),
    /// The single-slot token from older configurations.
    Legacy,
}

/// A token picked for one outbound call.
#[derive(Debug)]
pub struct ResolvedToken {
    pub source: TokenSource,
    pub secret: SecretString,
}

#[derive(Deserialize)]
struct TokensDoc {
    #[serde(default)]
    tokens: Vec<String>,
}

#[derive(Deserialize)]
struct LegacyDoc {
    #[serde(default)]
    token: String,
}

#[derive(Default)]
struct PoolState {
    tokens: Vec<SecretString>,
    legacy: Option<SecretString>,
}

impl PoolState {
    fn tokens_document(&self) -> serde_json::Value {
        let tokens: Vec<&str> = self.tokens.iter().map(|t| t.expose_secret()).collect();
        serde_json::json!({ "tokens": tokens })
    }

    fn check_index(&self, index: usize) -> Result<(), CredentialError> {
        if index < self.tokens.len() {
            Ok(())
        } else {
            Err(CredentialError::IndexOutOfRange {
                index,
                len: self.tokens.len(),
            })
        }
    }
}

/// Ordered pool of API tokens plus the legacy single-slot fallback.
pub struct CredentialPool {
    state: RwLock<PoolState>,
    store: Arc<dyn DocumentStore>,
}

impl CredentialPool {
    /// Create an empty pool backed by `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            store,
        }
    }

    /// Load the token list and legacy token. Failures degrade to empty.
    pub async fn load(store: Arc<dyn DocumentStore>) -> Self {
        let tokens = match load_doc::<TokensDoc>(store.as_ref(), keys::TOKENS).await {
            Some(doc) => doc.tokens.into_iter().map(SecretString::from).collect(),
            None => Vec::new(),
        };
        let legacy = load_doc::<LegacyDoc>(store.as_ref(), keys::LEGACY_TOKEN)
            .await
            .map(|doc| doc.token)
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        info!(
            count = tokens.len(),
            legacy = legacy.is_some(),
            "API tokens loaded"
        );
        Self {
            state: RwLock::new(PoolState { tokens, legacy }),
            store,
        }
    }

    /// Append a token. Returns its index.
    pub async fn append(&self, token: &str) -> Result<usize, Error> {
        let token = require_token(token)?;
        let mut state = self.state.write().await;

        state.tokens.push(SecretString::from(token));
        let index = state.tokens.len() - 1;
        if let Err(e) = self.persist_tokens(&state).await {
            state.tokens.pop();
            return Err(e.into());
        }

        info!(index, "API token added");
        Ok(index)
    }

    /// Replace the token at `index`.
    pub async fn update(&self, index: usize, token: &str) -> Result<(), Error> {
        let token = require_token(token)?;
        let mut state = self.state.write().await;
        state.check_index(index)?;

        let old = std::mem::replace(&mut state.tokens[index], SecretString::from(token));
        if let Err(e) = self.persist_tokens(&state).await {
            state.tokens[index] = old;
            return Err(e.into());
        }

        info!(index, "API token updated");
        Ok(())
    }

    /// Remove the token at `index`; later entries move down one slot.
    pub async fn remove(&self, index: usize) -> Result<(), Error> {
        let mut state = self.state.write().await;
        state.check_index(index)?;

        let removed = state.tokens.remove(index);
        if let Err(e) = self.persist_tokens(&state).await {
            state.tokens.insert(index, removed);
            return Err(e.into());
        }

        info!(index, remaining = state.tokens.len(), "API token removed");
        Ok(())
    }

    /// Set the legacy single-slot token.
    pub async fn set_legacy(&self, token: &str) -> Result<(), Error> {
        let token = require_token(token)?;
        let mut state = self.state.write().await;

        let doc = serde_json::json!({ "token": token });
        if let Err(e) = self.store.save(keys::LEGACY_TOKEN, &doc).await {
            error!("Failed to persist legacy API token: {}", e);
            return Err(e.into());
        }
        state.legacy = Some(SecretString::from(token));

        info!("Legacy API token set");
        Ok(())
    }

    /// Pick the token for a call.
    ///
    /// An in-range explicit index wins; otherwise the first pool entry;
    /// otherwise the legacy token. An out-of-range index is not an error.
    pub async fn resolve(&self, explicit: Option<usize>) -> Result<ResolvedToken, CredentialError> {
        let state = self.state.read().await;

        if let Some(i) = explicit {
            if let Some(token) = state.tokens.get(i) {
                return Ok(ResolvedToken {
                    source: TokenSource::Pool(i),
                    secret: copy_secret(token),
                });
            }
            warn!(
                index = i,
                len = state.tokens.len(),
                "Token index out of range, falling back"
            );
        }

        if let Some(first) = state.tokens.first() {
            return Ok(ResolvedToken {
                source: TokenSource::Pool(0),
                secret: copy_secret(first),
            });
        }

        match &state.legacy {
            Some(legacy) => Ok(ResolvedToken {
                source: TokenSource::Legacy,
                secret: copy_secret(legacy),
            }),
            None => Err(CredentialError::NoCredential),
        }
    }

    /// Masked tokens in index order, for display.
    pub async fn list_masked(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .tokens
            .iter()
            .map(|t| mask(t.expose_secret()))
            .collect()
    }

    /// Masked legacy token, if one is set.
    pub async fn legacy_masked(&self) -> Option<String> {
        self.state
            .read()
            .await
            .legacy
            .as_ref()
            .map(|t| mask(t.expose_secret()))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tokens.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn persist_tokens(&self, state: &PoolState) -> Result<(), StoreError> {
        self.store
            .save(keys::TOKENS, &state.tokens_document())
            .await
            .inspect_err(|e| error!("Failed to persist API tokens, rolled back: {}", e))
    }
}

/// Render a token for display: short tokens are fully hidden, longer ones
/// keep four characters at each end.
pub fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

fn copy_secret(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret())
}

fn require_token(token: &str) -> Result<&str, ValidationError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ValidationError::EmptyField("token".into()));
    }
    Ok(token)
}

async fn load_doc<T: serde::de::DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Option<T> {
    match store.load(key).await {
        Ok(Some(doc)) => match serde_json::from_value(doc) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, "Malformed token document, ignoring: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            error!(key, "Failed to load token document: {}", e);
            None
        }
    }
}
