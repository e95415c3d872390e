//! Local filesystem dedup store.
//!
//! One pretty-printed JSON document, replaced atomically on every save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{DedupState, DedupStore};

/// [`DedupStore`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonDedupStore {
    path: PathBuf,
    sources: Vec<String>,
    retention: Option<usize>,
}

impl JsonDedupStore {
    /// Create a store for `path` that knows the registered source names.
    pub fn new(path: impl Into<PathBuf>, sources: Vec<String>) -> Self {
        Self {
            path: path.into(),
            sources,
            retention: None,
        }
    }

    /// Keep at most `cap` ids per source when saving.
    pub fn with_retention(mut self, cap: Option<usize>) -> Self {
        self.retention = cap;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document, `None` if it does not exist.
    pub async fn read(&self) -> Result<Option<DedupState>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DedupStore for JsonDedupStore {
    async fn load(&self) -> DedupState {
        let mut state = match self.read().await {
            Ok(Some(state)) => state,
            Ok(None) => DedupState::default(),
            Err(e) => {
                log::warn!(
                    "State file {} is unreadable, starting empty: {}",
                    self.path.display(),
                    e
                );
                DedupState::default()
            }
        };
        state.ensure_sources(&self.sources);
        state
    }

    async fn save(&self, state: &DedupState) -> Result<()> {
        let bytes = match self.retention {
            Some(cap) => {
                let mut trimmed = state.clone();
                trimmed.trim_to(cap);
                serde_json::to_vec_pretty(&trimmed)?
            }
            None => serde_json::to_vec_pretty(state)?,
        };
        self.write_bytes(&bytes).await
    }
}
