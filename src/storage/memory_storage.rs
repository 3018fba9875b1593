use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

use super::storage_trait::KeyValueStorage;
use crate::error::{AppError, AppResult};

/// In-process store. Used as the session scope: its contents live exactly as
/// long as the value does, and `clear` ends the session early.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, as when a browsing session ends.
    pub fn clear(&self) -> AppResult<()> {
        let mut items = self.items.write().map_err(|e| {
            AppError::StorageError(format!("Failed to write session storage: {e}"))
        })?;
        debug!("Clearing {} entries from memory storage", items.len());
        items.clear();
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let mut items = self.items.write().map_err(|e| {
            AppError::StorageError(format!("Failed to write session storage: {e}"))
        })?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let items = self.items.read().map_err(|e| {
            AppError::StorageError(format!("Failed to read session storage: {e}"))
        })?;
        Ok(items.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        let mut items = self.items.write().map_err(|e| {
            AppError::StorageError(format!("Failed to write session storage: {e}"))
        })?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").await.unwrap(), None);

        storage.set_item("k", "v").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));

        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").await.unwrap();
        storage.set_item("b", "2").await.unwrap();
        storage.clear().unwrap();
        assert_eq!(storage.get_item("a").await.unwrap(), None);
        assert_eq!(storage.get_item("b").await.unwrap(), None);
    }
}
