use log::{debug, warn};

use crate::constants::TOKEN_STORAGE_KEY;
use crate::error::AppResult;
use crate::models::TokenPair;
use crate::storage::KeyValueStorage;

/// Load the token pair from durable storage.
///
/// An unreadable blob is removed and treated as "no session" so a bad write
/// cannot lock the user out permanently.
pub async fn load_tokens(storage: &dyn KeyValueStorage) -> AppResult<Option<TokenPair>> {
    let Some(raw) = storage.get_item(TOKEN_STORAGE_KEY).await? else {
        debug!("No persisted token pair found");
        return Ok(None);
    };

    match serde_json::from_str::<TokenPair>(&raw) {
        Ok(pair) => {
            debug!("Loaded token pair expiring at {}", pair.expires_at);
            Ok(Some(pair))
        }
        Err(e) => {
            warn!("Discarding malformed persisted token pair: {}", e);
            storage.remove_item(TOKEN_STORAGE_KEY).await?;
            Ok(None)
        }
    }
}

/// Save a token pair to durable storage. `None` clears it.
pub async fn save_tokens(storage: &dyn KeyValueStorage, tokens: Option<&TokenPair>) -> AppResult<()> {
    match tokens {
        Some(pair) => {
            let raw = serde_json::to_string(pair)?;
            storage.set_item(TOKEN_STORAGE_KEY, &raw).await?;
            debug!("Token pair persisted");
        }
        None => {
            storage.remove_item(TOKEN_STORAGE_KEY).await?;
            debug!("Persisted token pair cleared");
        }
    }
    Ok(())
}
