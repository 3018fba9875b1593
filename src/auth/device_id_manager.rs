use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::constants::DEVICE_ID_STORAGE_KEY;
use crate::error::AppResult;
use crate::storage::KeyValueStorage;

/// Hands out the device identifier that binds refresh tokens to this session.
///
/// The identifier lives in session-scoped storage, so it is stable until that
/// storage is cleared and a new one is minted on the next call.
#[derive(Debug)]
pub struct DeviceIdManager {
    storage: Arc<dyn KeyValueStorage>,
    // Keeps two first callers from minting different ids
    create_lock: Mutex<()>,
}

impl DeviceIdManager {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            create_lock: Mutex::new(()),
        }
    }

    /// Current device id, or `None` if session storage is unusable.
    pub async fn device_id(&self) -> Option<String> {
        match self.get_or_create().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Device id unavailable, continuing with unbound tokens: {}", e);
                None
            }
        }
    }

    async fn get_or_create(&self) -> AppResult<String> {
        if let Some(existing) = self.stored().await? {
            return Ok(existing);
        }

        let _guard = self.create_lock.lock().await;
        if let Some(existing) = self.stored().await? {
            return Ok(existing);
        }

        let value = Uuid::new_v4().to_string();
        self.storage.set_item(DEVICE_ID_STORAGE_KEY, &value).await?;
        info!("Generated new device id for this session");
        Ok(value)
    }

    async fn stored(&self) -> AppResult<Option<String>> {
        Ok(self
            .storage
            .get_item(DEVICE_ID_STORAGE_KEY)
            .await?
            .filter(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct BrokenStorage;

    #[async_trait]
    impl KeyValueStorage for BrokenStorage {
        async fn set_item(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::StorageError("unavailable".to_string()))
        }
        async fn get_item(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::StorageError("unavailable".to_string()))
        }
        async fn remove_item(&self, _key: &str) -> AppResult<()> {
            Err(AppError::StorageError("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_stable_within_session_and_new_after_clear() {
        let session = Arc::new(MemoryStorage::new());
        let manager = DeviceIdManager::new(session.clone());

        let first = manager.device_id().await.unwrap();
        let second = manager.device_id().await.unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());

        session.clear().unwrap();
        let third = manager.device_id().await.unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_agree() {
        let manager = Arc::new(DeviceIdManager::new(Arc::new(MemoryStorage::new())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.device_id().await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_unavailable_storage_degrades_to_none() {
        let manager = DeviceIdManager::new(Arc::new(BrokenStorage));
        assert!(manager.device_id().await.is_none());
    }
}
