use async_trait::async_trait;
use log::{error, info, warn};

use super::http_client::{HttpClient, RequestOptions};
use crate::auth::TokenRefresher;
use crate::error::AppResult;
use crate::models::{
    BaseResponse, ForgotPasswordRequest, ForgotUsernameRequest, LoginRequest, LoginResponse,
    RefreshRequest, ResendVerificationRequest, ResetPasswordRequest, SignupRequest,
    SignupResponse, VerifyEmailRequest,
};

/// Typed wrapper over the `/auth/*` endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: HttpClient,
}

impl AuthApi {
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Log in and, when the grant carries tokens, start the session.
    ///
    /// Accounts awaiting email verification get `requires_verification` and no
    /// tokens; the caller routes them to the verification flow.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> AppResult<LoginResponse> {
        info!("Attempting login for user: {}", username);

        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            remember_me,
        })?;

        let response: LoginResponse = self
            .client
            .post("/auth/login", Some(&body), &RequestOptions::skip_auth())
            .await
            .inspect_err(|e| error!("Login request failed: {}", e))?;

        if response.access_token.is_some() {
            self.client.token_manager().set_grant(&response).await?;
            info!("Login succeeded for user: {}", username);
        } else if response.requires_verification.unwrap_or(false) {
            info!("User {} must verify their email before logging in", username);
        }

        Ok(response)
    }

    /// Tell the server to end the session, then drop local tokens regardless.
    pub async fn logout(&self) -> AppResult<()> {
        if !self.client.token_manager().is_authenticated() {
            info!("Logout requested without an active session");
            return self.client.token_manager().clear().await;
        }

        let result: AppResult<Option<BaseResponse>> = self
            .client
            .post("/auth/logout", None, &RequestOptions::default())
            .await;
        if let Err(e) = &result {
            warn!("Server logout failed, clearing local session anyway: {}", e);
        }

        self.client.token_manager().clear().await?;
        result.map(|_| ())
    }

    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        device_id: Option<String>,
    ) -> AppResult<LoginResponse> {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: refresh_token.to_string(),
            device_id,
        })?;
        self.client
            .post("/auth/refresh", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn signup(&self, data: &SignupRequest) -> AppResult<SignupResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/signup", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn verify_email(&self, data: &VerifyEmailRequest) -> AppResult<BaseResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/verify-email", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn resend_verification(
        &self,
        data: &ResendVerificationRequest,
    ) -> AppResult<BaseResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/resend-verification", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn forgot_username(&self, data: &ForgotUsernameRequest) -> AppResult<BaseResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/forgot-username", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn forgot_password(&self, data: &ForgotPasswordRequest) -> AppResult<BaseResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/forgot-password", Some(&body), &RequestOptions::skip_auth())
            .await
    }

    pub async fn reset_password(&self, data: &ResetPasswordRequest) -> AppResult<BaseResponse> {
        let body = serde_json::to_value(data)?;
        self.client
            .post("/auth/reset-password", Some(&body), &RequestOptions::skip_auth())
            .await
    }
}

#[async_trait]
impl TokenRefresher for AuthApi {
    async fn refresh_tokens(
        &self,
        refresh_token: &str,
        device_id: Option<String>,
    ) -> AppResult<LoginResponse> {
        self.refresh_token(refresh_token, device_id).await
    }
}
