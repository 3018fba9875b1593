use log::{debug, info};

use super::http_client::{HttpClient, RequestOptions};
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderDetailResponse, OrderRequest, OrderResponse, OrdersListResponse};

/// Typed wrapper over the `/orders` endpoints.
#[derive(Debug, Clone)]
pub struct OrdersApi {
    client: HttpClient,
}

impl OrdersApi {
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Submit an order. Resubmitting the same `request_id` returns the
    /// original order instead of placing a second one.
    pub async fn submit_order(&self, order: &OrderRequest) -> AppResult<OrderResponse> {
        info!(
            "Submitting {:?} {:?} order for {} {} (request {})",
            order.order_type, order.side, order.quantity, order.symbol, order.request_id
        );
        let body = serde_json::to_value(order)?;
        self.client
            .post("/orders", Some(&body), &RequestOptions::default())
            .await
    }

    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        let response: OrdersListResponse =
            self.client.get("/orders", &RequestOptions::default()).await?;
        debug!("Fetched {} orders", response.orders.len());
        Ok(response.orders)
    }

    pub async fn get_order(&self, order_id: &str) -> AppResult<Order> {
        let path = order_path(order_id)?;
        let response: OrderDetailResponse =
            self.client.get(&path, &RequestOptions::default()).await?;
        Ok(response.order)
    }

    pub async fn cancel_order(&self, order_id: &str) -> AppResult<OrderResponse> {
        let path = order_path(order_id)?;
        info!("Cancelling order {}", order_id);
        self.client.delete(&path, &RequestOptions::default()).await
    }
}

fn order_path(order_id: &str) -> AppResult<String> {
    if order_id.trim().is_empty() {
        return Err(AppError::ValidationError("Order id is required".to_string()));
    }
    Ok(format!("/orders/{}", urlencoding::encode(order_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_path_encodes_id() {
        assert_eq!(order_path("o-1").unwrap(), "/orders/o-1");
        assert_eq!(order_path("a/b c").unwrap(), "/orders/a%2Fb%20c");
        assert!(matches!(order_path(" "), Err(AppError::ValidationError(_))));
    }
}
