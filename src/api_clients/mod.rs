// Root module for API clients
pub mod auth_api;
pub mod book_api;
pub mod client_factory;
pub mod error_handling;
pub mod http_client;
pub mod orders_api;

pub use auth_api::AuthApi;
pub use book_api::BookApi;
pub use client_factory::create_http_client;
pub use error_handling::{decode_envelope, map_api_error};
pub use http_client::{HttpClient, RequestOptions, RequestState};
pub use orders_api::OrdersApi;
