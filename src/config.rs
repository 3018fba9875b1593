use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REFRESH_MARGIN_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    SERVER_API_URL,
};
use crate::error::{AppError, AppResult};
use crate::utils::env_utils::{read_env, read_env_i64, read_env_opt, read_env_u64};

/// Where the durable token store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file under `storage_dir`
    File,
    /// OS credential store
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::ConfigError(format!(
                "Unknown storage backend '{other}', expected file, keyring or memory"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Access tokens closer than this to `expires_at` are refreshed before use.
    pub refresh_margin: chrono::Duration,
    pub storage_backend: StorageBackend,
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: SERVER_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            refresh_margin: chrono::Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            storage_backend: StorageBackend::File,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Build the configuration from `TRADING_*` (or bare) environment variables.
    pub fn from_env() -> AppResult<Self> {
        let server_url = read_env("SERVER_URL", SERVER_API_URL);
        let storage_backend = match read_env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::File,
        };

        let config = Self {
            server_url,
            request_timeout: Duration::from_secs(read_env_u64(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(read_env_u64(
                "CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            refresh_margin: margin_from_secs(read_env_i64(
                "REFRESH_MARGIN_SECS",
                DEFAULT_REFRESH_MARGIN_SECS,
            ))?,
            storage_backend,
            storage_dir: read_env_opt("STORAGE_DIR").map(PathBuf::from),
        };
        config.validate()?;

        info!(
            "Client configured for {} (storage: {:?})",
            config.server_url, config.storage_backend
        );
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.server_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "Server URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.refresh_margin < chrono::Duration::zero() {
            return Err(AppError::ConfigError(
                "Refresh margin cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory for the file-backed store, falling back to the platform data dir.
    pub fn resolved_storage_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("trading-client"))
            .ok_or_else(|| AppError::ConfigError("Failed to get local data dir".to_string()))
    }
}

fn margin_from_secs(secs: i64) -> AppResult<chrono::Duration> {
    chrono::Duration::try_seconds(secs)
        .ok_or_else(|| AppError::ConfigError(format!("Refresh margin out of range: {secs}s")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh_margin, chrono::Duration::seconds(30));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = ClientConfig::new("ftp://example.com");
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));

        let config = ClientConfig::new("not a url");
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_margin_out_of_range_is_config_error() {
        assert_eq!(margin_from_secs(45), Ok(chrono::Duration::seconds(45)));
        assert!(matches!(
            margin_from_secs(i64::MAX),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("File".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!(" keyring ".parse::<StorageBackend>(), Ok(StorageBackend::Keyring));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
