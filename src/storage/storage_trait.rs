use crate::error::AppResult;
use async_trait::async_trait;
use std::fmt::Debug;

/// Plain key to string store backing one persistence scope.
#[async_trait]
pub trait KeyValueStorage: Send + Sync + Debug {
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    async fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    async fn remove_item(&self, key: &str) -> AppResult<()>;
}
