use log::info;
use std::sync::Arc;

use crate::api_clients::{AuthApi, BookApi, HttpClient, OrdersApi};
use crate::auth::{DeviceIdManager, TokenManager, TokenRefresher};
use crate::config::{ClientConfig, StorageBackend};
use crate::error::AppResult;
use crate::storage::{FileStorage, KeyValueStorage, KeyringStorage, MemoryStorage};

/// Composition root: owns every collaborator and wires the token refresher.
///
/// Keep this value alive for as long as any client cloned out of it is used;
/// the token manager only holds a weak reference to `auth`.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub http: HttpClient,
    pub auth: Arc<AuthApi>,
    pub orders: OrdersApi,
    pub book: BookApi,
    pub token_manager: TokenManager,
    pub device_ids: Arc<DeviceIdManager>,
}

impl ApiContext {
    /// Build a context with the durable backend named in `config` and a
    /// fresh in-memory session scope.
    pub async fn from_config(config: &ClientConfig) -> AppResult<Self> {
        config.validate()?;
        let durable: Arc<dyn KeyValueStorage> = match config.storage_backend {
            StorageBackend::File => Arc::new(FileStorage::new(config.resolved_storage_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::default()),
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, durable, Arc::new(MemoryStorage::new())).await
    }

    pub async fn with_storage(
        config: &ClientConfig,
        durable: Arc<dyn KeyValueStorage>,
        session: Arc<dyn KeyValueStorage>,
    ) -> AppResult<Self> {
        let device_ids = Arc::new(DeviceIdManager::new(session));
        let token_manager =
            TokenManager::new(durable, Arc::clone(&device_ids), config.refresh_margin).await;
        let http = HttpClient::new(config, token_manager.clone(), Arc::clone(&device_ids))?;

        let auth = Arc::new(AuthApi::new(http.clone()));
        let refresher: Arc<dyn TokenRefresher> = auth.clone();
        token_manager.set_refresher(Arc::downgrade(&refresher))?;

        info!("API context ready for {}", http.server_url());
        Ok(Self {
            orders: OrdersApi::new(http.clone()),
            book: BookApi::new(http.clone()),
            http,
            auth,
            token_manager,
            device_ids,
        })
    }
}
