pub mod device_id_manager;
pub mod header_utils;
pub mod token_introspection;
pub mod token_manager;
pub mod token_persistence;
pub mod token_refresh;

pub use device_id_manager::DeviceIdManager;
pub use token_manager::TokenManager;
pub use token_refresh::TokenRefresher;
