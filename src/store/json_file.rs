//! File-backed document store: one pretty-printed JSON file per key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;
use crate::store::traits::DocumentStore;

/// Stores each document as `<base>/<key>.json`.
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `base_path`. The directory is created lazily.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn doc_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.doc_path(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc = serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(doc))
    }

    async fn save(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;

        let body = serde_json::to_string_pretty(doc).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        // Write to a sibling temp file, then rename over the target.
        let path = self.doc_path(key);
        let tmp = self.base_path.join(format!(".{key}.json.tmp"));
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(body.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;

        debug!(key, path = %path.display(), "Document saved");
        Ok(())
    }
}
