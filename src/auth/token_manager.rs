use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock, Weak};
use tokio::sync::Mutex as AsyncMutex;

use super::device_id_manager::DeviceIdManager;
use super::token_persistence::{load_tokens, save_tokens};
use super::token_refresh::{TokenRefresher, pair_from_grant};
use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, TokenPair};
use crate::storage::KeyValueStorage;
use crate::utils::single_flight::SingleFlight;

struct TokenState {
    tokens: RwLock<Option<TokenPair>>,
    // Bumped by every set/clear; only changed while `writes` is held
    epoch: AtomicU64,
    // Serializes memory updates together with their persistence
    writes: AsyncMutex<()>,
    storage: Arc<dyn KeyValueStorage>,
    device_ids: Arc<DeviceIdManager>,
    refresher: OnceLock<Weak<dyn TokenRefresher>>,
    refresh_flight: SingleFlight<AppResult<String>>,
    margin: Duration,
}

/// Owns the current token pair and the single in-flight refresh.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenManager {
    state: Arc<TokenState>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("authenticated", &self.is_authenticated())
            .field("refresh_pending", &self.state.refresh_flight.is_pending())
            .field("margin_secs", &self.state.margin.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Build a manager and hydrate it from durable storage.
    pub async fn new(
        storage: Arc<dyn KeyValueStorage>,
        device_ids: Arc<DeviceIdManager>,
        margin: Duration,
    ) -> Self {
        let manager = Self {
            state: Arc::new(TokenState {
                tokens: RwLock::new(None),
                epoch: AtomicU64::new(0),
                writes: AsyncMutex::new(()),
                storage,
                device_ids,
                refresher: OnceLock::new(),
                refresh_flight: SingleFlight::new(),
                margin,
            }),
        };
        manager.hydrate().await;
        manager
    }

    async fn hydrate(&self) {
        match load_tokens(self.state.storage.as_ref()).await {
            Ok(Some(pair)) => {
                if let Err(e) = self.state.write(Some(pair)) {
                    error!("TokenManager: Failed to restore persisted tokens: {}", e);
                } else {
                    info!("TokenManager: Restored session from durable storage.");
                }
            }
            Ok(None) => debug!("TokenManager: No persisted session."),
            Err(e) => warn!(
                "TokenManager: Failed to read persisted tokens: {}. Starting signed out.",
                e
            ),
        }
    }

    /// Wire the refresh capability. Must happen before the first refresh.
    pub fn set_refresher(&self, refresher: Weak<dyn TokenRefresher>) -> AppResult<()> {
        self.state.refresher.set(refresher).map_err(|_| {
            AppError::InitializationError("Token refresher already set".to_string())
        })
    }

    pub fn margin(&self) -> Duration {
        self.state.margin
    }

    pub fn snapshot(&self) -> Option<TokenPair> {
        self.state.read().ok().flatten()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Store a pair in memory and durable storage.
    pub async fn set_tokens(&self, pair: TokenPair) -> AppResult<()> {
        self.state.store(Some(pair)).await
    }

    /// Store the tokens carried by a login grant.
    pub async fn set_grant(&self, grant: &LoginResponse) -> AppResult<TokenPair> {
        let previous = self.snapshot().map(|p| p.refresh_token);
        let pair = pair_from_grant(grant, previous.as_deref(), Utc::now())?;
        self.set_tokens(pair.clone()).await?;
        Ok(pair)
    }

    /// Wipe tokens from memory and durable storage.
    pub async fn clear(&self) -> AppResult<()> {
        info!("TokenManager: Clearing session.");
        self.state.store(None).await
    }

    /// Current access token, refreshing first if it is inside the safety margin.
    pub async fn access_token(&self) -> AppResult<String> {
        let margin = self.state.margin;
        self.run_refresh(move |pair| pair.is_fresh(Utc::now(), margin))
            .await
    }

    /// Refresh now, or join the refresh already in flight.
    pub async fn refresh(&self) -> AppResult<String> {
        self.run_refresh(|_| false).await
    }

    /// Refresh after the server rejected `rejected`.
    ///
    /// If another caller already replaced that token, the replacement is
    /// returned without a second network call.
    pub async fn refresh_rejected(&self, rejected: &str) -> AppResult<String> {
        let margin = self.state.margin;
        let rejected = rejected.to_string();
        self.run_refresh(move |pair| {
            pair.access_token != rejected && pair.is_fresh(Utc::now(), margin)
        })
        .await
    }

    async fn run_refresh<A>(&self, acceptable: A) -> AppResult<String>
    where
        A: FnOnce(&TokenPair) -> bool,
    {
        let state = Arc::clone(&self.state);
        let flight = self.state.refresh_flight.join_or_start(
            || match self.state.read() {
                Ok(Some(pair)) if acceptable(&pair) => Some(Ok(pair.access_token)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            },
            move || TokenState::perform_refresh(state),
        )?;
        flight.resolve().await
    }
}

impl TokenState {
    fn read(&self) -> AppResult<Option<TokenPair>> {
        self.tokens
            .read()
            .map(|guard| guard.clone())
            .map_err(|e| AppError::InternalError(format!("Token lock poisoned: {e}")))
    }

    fn write(&self, tokens: Option<TokenPair>) -> AppResult<()> {
        let mut guard = self
            .tokens
            .write()
            .map_err(|e| AppError::InternalError(format!("Token lock poisoned: {e}")))?;
        *guard = tokens;
        Ok(())
    }

    /// Replace the session and invalidate any refresh started before now.
    async fn store(&self, tokens: Option<TokenPair>) -> AppResult<()> {
        let _guard = self.writes.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.commit(tokens).await
    }

    /// Store a refresh outcome only if the session is still the one the
    /// refresh started from.
    async fn store_if_current(&self, tokens: Option<TokenPair>, epoch: u64) -> AppResult<bool> {
        let _guard = self.writes.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Ok(false);
        }
        self.commit(tokens).await?;
        Ok(true)
    }

    async fn commit(&self, tokens: Option<TokenPair>) -> AppResult<()> {
        let persisted = tokens.clone();
        self.write(tokens)?;

        if let Err(e) = save_tokens(self.storage.as_ref(), persisted.as_ref()).await {
            warn!(
                "TokenManager: Failed to persist tokens: {}. Change only applied in memory.",
                e
            );
        }
        Ok(())
    }

    fn refresher(&self) -> AppResult<Arc<dyn TokenRefresher>> {
        self.refresher
            .get()
            .ok_or_else(|| {
                AppError::InitializationError(
                    "Token refresher used before it was wired".to_string(),
                )
            })?
            .upgrade()
            .ok_or_else(|| {
                AppError::InitializationError("Token refresher has been dropped".to_string())
            })
    }

    async fn perform_refresh(state: Arc<Self>) -> AppResult<String> {
        let refresher = state.refresher()?;

        let (epoch, current) = {
            let _guard = state.writes.lock().await;
            (state.epoch.load(Ordering::SeqCst), state.read()?)
        };
        let Some(current) = current else {
            return Err(AppError::AuthError(
                "No active session, please log in".to_string(),
            ));
        };

        let device_id = state.device_ids.device_id().await;
        info!("TokenManager: Refreshing access token.");

        let outcome = refresher
            .refresh_tokens(&current.refresh_token, device_id)
            .await
            .and_then(|grant| pair_from_grant(&grant, Some(&current.refresh_token), Utc::now()));

        match outcome {
            Ok(pair) => {
                let token = pair.access_token.clone();
                if state.store_if_current(Some(pair), epoch).await? {
                    info!("TokenManager: Token refreshed successfully.");
                    Ok(token)
                } else {
                    state.superseded()
                }
            }
            Err(e) => {
                match state.store_if_current(None, epoch).await {
                    Ok(true) => warn!("TokenManager: Refresh failed ({}), cleared session.", e),
                    Ok(false) => return state.superseded(),
                    Err(clear_err) => error!("TokenManager: Failed to clear tokens: {}", clear_err),
                }
                Err(AppError::AuthError(format!(
                    "Session expired, please log in again: {e}"
                )))
            }
        }
    }

    /// Outcome for a refresh whose session was replaced or cleared meanwhile.
    fn superseded(&self) -> AppResult<String> {
        info!("TokenManager: Session changed during refresh, discarding result.");
        match self.read()? {
            Some(pair) => Ok(pair.access_token),
            None => Err(AppError::AuthError(
                "Logged out during token refresh".to_string(),
            )),
        }
    }
}
