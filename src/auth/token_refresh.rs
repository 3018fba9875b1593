use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use super::token_introspection;
use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, TokenPair};

/// The one capability `TokenManager` needs from the auth API.
///
/// Kept narrow so the token manager never depends on the HTTP client that in
/// turn depends on it.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_tokens(
        &self,
        refresh_token: &str,
        device_id: Option<String>,
    ) -> AppResult<LoginResponse>;
}

/// Turn a login/refresh grant into a token pair.
///
/// A grant without a refresh token keeps `previous_refresh`. Expiry comes from
/// `expiresIn`, falling back to the JWT `exp` claim.
pub fn pair_from_grant(
    grant: &LoginResponse,
    previous_refresh: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<TokenPair> {
    if !grant.success {
        return Err(AppError::AuthError(
            grant
                .error
                .clone()
                .unwrap_or_else(|| "Token grant was rejected".to_string()),
        ));
    }

    let access_token = grant
        .access_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidResponse("Grant is missing accessToken".to_string()))?;

    let refresh_token = grant
        .refresh_token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| previous_refresh.map(str::to_string))
        .ok_or_else(|| AppError::InvalidResponse("Grant is missing refreshToken".to_string()))?;

    if let Some(expires_in) = grant.expires_in {
        return TokenPair::from_expires_in(access_token, refresh_token, expires_in, now);
    }

    let expires_at = token_introspection::decode_exp(&access_token).ok_or_else(|| {
        AppError::InvalidResponse("Grant has neither expiresIn nor a JWT exp claim".to_string())
    })?;
    debug!("Grant omitted expiresIn, using JWT exp {}", expires_at);
    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(access: Option<&str>, refresh: Option<&str>, expires_in: Option<i64>) -> LoginResponse {
        LoginResponse {
            success: true,
            access_token: access.map(str::to_string),
            refresh_token: refresh.map(str::to_string),
            expires_in,
            ..LoginResponse::default()
        }
    }

    #[test]
    fn test_pair_from_full_grant() {
        let now = Utc::now();
        let pair = pair_from_grant(&grant(Some("A1"), Some("R1"), Some(3600)), None, now).unwrap();
        assert_eq!(pair.access_token, "A1");
        assert_eq!(pair.refresh_token, "R1");
        assert_eq!(pair.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn test_missing_refresh_token_keeps_previous() {
        let pair =
            pair_from_grant(&grant(Some("A2"), None, Some(60)), Some("R1"), Utc::now()).unwrap();
        assert_eq!(pair.refresh_token, "R1");
    }

    #[test]
    fn test_expiry_from_jwt_exp() {
        let jwt = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJleHAiOjEyMzQ1Njc4OTAsInN1YiI6InRlc3QifQ.signature";
        let pair = pair_from_grant(&grant(Some(jwt), Some("R"), None), None, Utc::now()).unwrap();
        assert_eq!(pair.expires_at.timestamp(), 1_234_567_890);
    }

    #[test]
    fn test_rejected_or_incomplete_grants() {
        let mut rejected = grant(Some("A"), Some("R"), Some(1));
        rejected.success = false;
        rejected.error = Some("Invalid refresh token".to_string());
        assert_eq!(
            pair_from_grant(&rejected, None, Utc::now()),
            Err(AppError::AuthError("Invalid refresh token".to_string()))
        );

        assert!(matches!(
            pair_from_grant(&grant(None, Some("R"), Some(1)), None, Utc::now()),
            Err(AppError::InvalidResponse(_))
        ));
        assert!(matches!(
            pair_from_grant(&grant(Some("opaque"), Some("R"), None), None, Utc::now()),
            Err(AppError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_huge_expires_in_is_invalid_response() {
        let result = pair_from_grant(
            &grant(Some("A"), Some("R"), Some(9_000_000_000_000_000_000)),
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::InvalidResponse(_))));
    }
}
