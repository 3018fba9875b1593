use log::info;
use reqwest::Client;

use crate::config::ClientConfig;
use crate::constants::USER_AGENT;
use crate::error::{AppError, AppResult};

/// Build the shared reqwest client with the configured timeouts.
pub fn create_http_client(config: &ClientConfig) -> AppResult<Client> {
    info!(
        "Creating HTTP client (timeout {:?}, connect timeout {:?})",
        config.request_timeout, config.connect_timeout
    );
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|e| AppError::InitializationError(format!("Failed to build HTTP client: {e}")))
}
