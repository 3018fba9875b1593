use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

// Token state

/// Access/refresh token pair with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Build a pair whose expiry is `expires_in_secs` from `now`.
    ///
    /// Fails with `InvalidResponse` when the expiry is not a representable
    /// instant.
    pub fn from_expires_in(
        access_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::InvalidResponse(format!("expiresIn out of range: {expires_in_secs}"))
            })?;
        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Usable only while `now < expires_at - margin`.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|deadline| now < deadline)
    }
}

// Auth wire types

/// Server user ids arrive as either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

/// Body of both `/auth/login` and `/auth/refresh` responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user_id: Option<UserId>,
    pub user_role: Option<String>,
    pub requires_verification: Option<bool>,
    pub email: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: Option<UserId>,
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub user_id: UserId,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotUsernameRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BaseResponse {
    pub success: bool,
    pub error: Option<String>,
    pub message: Option<String>,
}

// Trading wire types

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Client-chosen idempotency key; resubmits with the same key are deduplicated.
    pub request_id: String,
}

impl OrderRequest {
    /// Market order with a fresh idempotency key.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price: None,
            order_type: OrderType::Market,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Limit order with a fresh idempotency key.
    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            price: Some(price),
            order_type: OrderType::Limit,
            ..Self::market(symbol, side, quantity)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    pub order_id: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub user_id: Option<UserId>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    #[serde(default)]
    pub filled_quantity: f64,
    pub avg_price: Option<f64>,
    pub created_at: Option<f64>,
    pub updated_at: Option<f64>,
    pub request_id: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersListResponse {
    pub success: bool,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookResponse {
    pub success: bool,
    pub symbol: String,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    pub timestamp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_pair_json_round_trip_keeps_expiry() {
        let now = DateTime::parse_from_rfc3339("2026-10-16T12:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let pair = TokenPair::from_expires_in("A1".into(), "R1".into(), 3600, now).unwrap();

        let json = serde_json::to_string(&pair).unwrap();
        assert!(json.contains("\"accessToken\":\"A1\""));
        let back: TokenPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
        assert_eq!(back.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn test_freshness_respects_margin() {
        let now = Utc::now();
        let pair = TokenPair {
            access_token: "A".into(),
            refresh_token: "R".into(),
            expires_at: now + Duration::seconds(5),
        };
        assert!(pair.is_fresh(now, Duration::zero()));
        assert!(!pair.is_fresh(now, Duration::seconds(30)));
    }

    #[test]
    fn test_unrepresentable_expiry_is_invalid_response() {
        let now = Utc::now();
        for secs in [9_000_000_000_000_000_000, i64::MAX, i64::MIN] {
            assert!(matches!(
                TokenPair::from_expires_in("A".into(), "R".into(), secs, now),
                Err(AppError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn test_freshness_near_min_date_is_not_fresh() {
        let pair = TokenPair {
            access_token: "A".into(),
            refresh_token: "R".into(),
            expires_at: DateTime::<Utc>::MIN_UTC,
        };
        assert!(!pair.is_fresh(Utc::now(), Duration::seconds(30)));
    }

    #[test]
    fn test_user_id_accepts_number_or_string() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"success":true,"userId":42}"#).unwrap();
        assert_eq!(resp.user_id, Some(UserId::Number(42)));

        let resp: LoginResponse =
            serde_json::from_str(r#"{"success":true,"userId":"u-42"}"#).unwrap();
        assert_eq!(resp.user_id.map(|u| u.to_string()).as_deref(), Some("u-42"));
    }

    #[test]
    fn test_unknown_order_status_does_not_fail() {
        let order: Order = serde_json::from_str(
            r#"{"orderId":"o1","symbol":"BTC-USD","side":"buy","quantity":1.0,
                "type":"market","status":"EXPIRED"}"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
        assert_eq!(order.filled_quantity, 0.0);
    }
}
