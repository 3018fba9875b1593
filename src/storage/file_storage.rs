use async_trait::async_trait;
use log::{debug, error};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::storage_trait::KeyValueStorage;
use crate::constants::STORAGE_FILE_NAME;
use crate::error::{AppError, AppResult};

/// Durable store keeping every entry in one JSON object on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORAGE_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> AppResult<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                error!("Storage file {} is corrupt: {}", self.path.display(), e);
                AppError::StorageError(format!("Failed to parse storage file: {e}"))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to read storage file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_all(&self, items: &BTreeMap<String, String>) -> AppResult<()> {
        let write_err = |e: std::io::Error| {
            AppError::StorageError(format!(
                "Failed to write storage file {}: {}",
                self.path.display(),
                e
            ))
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let bytes = serde_json::to_vec_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        debug!("Wrote {} entries to {}", items.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items).await
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        Ok(items.remove(key))
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}
