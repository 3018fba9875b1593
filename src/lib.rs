//! Client for the trading API: authentication flows plus typed order and
//! order-book calls, with access tokens attached, persisted and refreshed
//! transparently.

pub mod api_clients;
pub mod app_setup;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage;
pub mod utils;

pub use api_clients::{AuthApi, BookApi, HttpClient, OrdersApi, RequestOptions};
pub use app_setup::ApiContext;
pub use auth::{DeviceIdManager, TokenManager, TokenRefresher};
pub use config::{ClientConfig, StorageBackend};
pub use error::{AppError, AppResult, SerializableError};
pub use models::TokenPair;
