use super::http_client::{HttpClient, RequestOptions};
use crate::error::{AppError, AppResult};
use crate::models::OrderBookResponse;

/// Read-only access to the order book.
#[derive(Debug, Clone)]
pub struct BookApi {
    client: HttpClient,
}

impl BookApi {
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<u32>,
    ) -> AppResult<OrderBookResponse> {
        self.client
            .get(&book_path(symbol, depth)?, &RequestOptions::default())
            .await
    }
}

fn book_path(symbol: &str, depth: Option<u32>) -> AppResult<String> {
    if symbol.trim().is_empty() {
        return Err(AppError::ValidationError("Symbol is required".to_string()));
    }
    let mut path = format!("/book/{}", urlencoding::encode(symbol));
    if let Some(depth) = depth {
        path.push_str(&format!("?depth={depth}"));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_path() {
        assert_eq!(book_path("BTC-USD", None).unwrap(), "/book/BTC-USD");
        assert_eq!(book_path("ETH/USD", Some(10)).unwrap(), "/book/ETH%2FUSD?depth=10");
        assert!(book_path("", None).is_err());
    }
}
