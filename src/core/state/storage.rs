//! Watermark persistence backends

use super::watermark::RunWatermark;
use crate::domain::{EngineError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// State storage trait for watermark persistence
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the watermark for a provider
    ///
    /// Returns `Ok(None)` if none has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored watermark can't be read.
    async fn load_watermark(&self, provider: &str) -> Result<Option<RunWatermark>>;

    /// Save a watermark, replacing any previous one for the same provider
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn save_watermark(&self, watermark: &RunWatermark) -> Result<()>;

    /// All saved watermarks, sorted by provider
    ///
    /// # Errors
    ///
    /// Returns an error if the storage can't be listed.
    async fn get_all_watermarks(&self) -> Result<Vec<RunWatermark>>;
}

/// One JSON file per provider in a directory
///
/// Saves go to a temporary file that is then renamed over the old one, so a
/// crash mid-write leaves the previous watermark intact.
#[derive(Debug, Clone)]
pub struct FileStateStorage {
    directory: PathBuf,
}

impl FileStateStorage {
    /// Storage rooted at `directory` (created on first save)
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, provider: &str) -> Result<PathBuf> {
        let valid = !provider.is_empty()
            && provider
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(EngineError::State(format!(
                "Invalid watermark key '{provider}'"
            )));
        }
        Ok(self.directory.join(format!("{provider}.json")))
    }
}

#[async_trait]
impl StateStorage for FileStateStorage {
    async fn load_watermark(&self, provider: &str) -> Result<Option<RunWatermark>> {
        let path = self.path_for(provider)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EngineError::State(format!(
                    "Failed to read watermark {}: {e}",
                    path.display()
                )))
            }
        };

        let watermark = serde_json::from_str(&contents).map_err(|e| {
            EngineError::State(format!("Corrupt watermark {}: {e}", path.display()))
        })?;
        Ok(Some(watermark))
    }

    async fn save_watermark(&self, watermark: &RunWatermark) -> Result<()> {
        let path = self.path_for(&watermark.id)?;
        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            EngineError::State(format!(
                "Failed to create state directory {}: {e}",
                self.directory.display()
            ))
        })?;

        let json = serde_json::to_string_pretty(watermark)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), "Watermark saved");
        Ok(())
    }

    async fn get_all_watermarks(&self) -> Result<Vec<RunWatermark>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut watermarks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<RunWatermark>(&contents) {
                Ok(watermark) => watermarks.push(watermark),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable watermark"
                ),
            }
        }

        watermarks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(watermarks)
    }
}
