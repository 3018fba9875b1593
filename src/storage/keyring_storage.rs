use async_trait::async_trait;
use keyring::{Entry, Error as KeyringError};
use log::{debug, error};

use super::storage_trait::KeyValueStorage;
use crate::constants::SERVICE_NAME_FOR_KEYRING;
use crate::error::{AppError, AppResult};

/// Durable store backed by the OS credential store, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(SERVICE_NAME_FOR_KEYRING)
    }
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> AppResult<Entry> {
        Entry::new(&self.service, key).map_err(|e| {
            error!(
                "Failed to create keyring entry - OS: {:?}, Error: {}",
                std::env::consts::OS,
                e
            );
            AppError::StorageError(format!("Failed to create keyring entry: {e}"))
        })
    }
}

#[async_trait]
impl KeyValueStorage for KeyringStorage {
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.entry(key)?.set_password(value).map_err(|e| {
            error!(
                "Failed to store '{}' in keyring - OS: {:?}, Error: {}",
                key,
                std::env::consts::OS,
                e
            );
            AppError::from(e)
        })?;
        debug!("Saved '{}' to keyring", key);
        Ok(())
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => {
                debug!("No keyring entry for '{}'", key);
                Ok(None)
            }
            Err(e) => {
                error!(
                    "Keyring error - OS: {:?}, Error type: {:?}, Details: {}",
                    std::env::consts::OS,
                    e,
                    e
                );
                Err(AppError::from(e))
            }
        }
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!("Removed '{}' from keyring", key);
                Ok(())
            }
            // Already empty
            Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}
