// Default fallback URL for the trading API. Prefer environment variables.
pub const SERVER_API_URL: &str = "http://localhost:8080";

// Prefix tried before the bare name when reading environment variables
pub const ENV_PREFIX: &str = "TRADING_";

// Storage keys
pub const TOKEN_STORAGE_KEY: &str = "trading_client.tokens";
pub const DEVICE_ID_STORAGE_KEY: &str = "trading_client.device_id";

// Keyring service name for the durable token store
pub const SERVICE_NAME_FOR_KEYRING: &str = "trading-client";

// File name used by the file-backed durable store
pub const STORAGE_FILE_NAME: &str = "storage.json";

// Device binding headers
pub const HEADER_DEVICE_ID: &str = "x-device-id";
pub const HEADER_TOKEN_BINDING: &str = "X-Token-Binding";

/// Seconds before `expires_at` at which an access token is treated as expired.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 30;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Number of resends after a 401 once the token has been refreshed
pub const MAX_AUTH_RETRIES: u32 = 1;

pub const USER_AGENT: &str = concat!("trading-client/", env!("CARGO_PKG_VERSION"));
