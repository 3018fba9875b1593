use log::{debug, warn};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::client_factory::create_http_client;
use super::error_handling::{decode_envelope, map_api_error};
use crate::auth::{DeviceIdManager, TokenManager, header_utils};
use crate::config::ClientConfig;
use crate::constants::MAX_AUTH_RETRIES;
use crate::error::{AppError, AppResult};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send without an Authorization header and never refresh on 401.
    pub skip_auth: bool,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn skip_auth() -> Self {
        Self {
            skip_auth: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Lifecycle of one logical call, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    NotSent,
    Sent,
    AuthFailedFirstTry,
    Refreshing,
    Retried,
    Success,
    AuthFailedFinal,
    OtherError,
    TransportError,
}

/// JSON client for the trading API that attaches and renews access tokens.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    base_url: String,
    token_manager: TokenManager,
    device_ids: Arc<DeviceIdManager>,
}

impl HttpClient {
    pub fn new(
        config: &ClientConfig,
        token_manager: TokenManager,
        device_ids: Arc<DeviceIdManager>,
    ) -> AppResult<Self> {
        let http = create_http_client(config)?;
        Self::with_client(http, &config.server_url, token_manager, device_ids)
    }

    pub fn with_client(
        http: Client,
        server_url: &str,
        token_manager: TokenManager,
        device_ids: Arc<DeviceIdManager>,
    ) -> AppResult<Self> {
        Url::parse(server_url)?;
        Ok(Self {
            http,
            base_url: server_url.trim_end_matches('/').to_string(),
            token_manager,
            device_ids,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: &RequestOptions) -> AppResult<T> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> AppResult<T> {
        self.request(Method::POST, path, body, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> AppResult<T> {
        self.request(Method::PUT, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, options: &RequestOptions) -> AppResult<T> {
        self.request(Method::DELETE, path, None, options).await
    }

    /// Send a request and decode the `{ success, ... }` envelope.
    ///
    /// A 401 on an authenticated call triggers one token refresh and one
    /// resend; a second 401 is returned as `AuthError`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> AppResult<T> {
        let url = self.url_for(path);
        let mut state = RequestState::NotSent;
        let mut auth_retries = 0;

        let mut token = if options.skip_auth {
            None
        } else {
            Some(self.token_manager.access_token().await?)
        };

        loop {
            let response = match self
                .send_once(&method, &url, body, options, token.as_deref())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    transition(&mut state, RequestState::TransportError, &method, &url);
                    return Err(e);
                }
            };
            let next = if auth_retries == 0 {
                RequestState::Sent
            } else {
                RequestState::Retried
            };
            transition(&mut state, next, &method, &url);

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| AppError::NetworkError(format!("Failed to read response body: {e}")))?;

            if status.is_success() {
                transition(&mut state, RequestState::Success, &method, &url);
                return decode_envelope(&text);
            }

            if status == StatusCode::UNAUTHORIZED && !options.skip_auth {
                if auth_retries >= MAX_AUTH_RETRIES {
                    transition(&mut state, RequestState::AuthFailedFinal, &method, &url);
                    return Err(match map_api_error(status.as_u16(), &text) {
                        auth @ AppError::AuthError(_) => auth,
                        other => AppError::AuthError(other.to_string()),
                    });
                }

                transition(&mut state, RequestState::AuthFailedFirstTry, &method, &url);
                warn!("{} {} returned 401, refreshing token and retrying once", method, url);
                transition(&mut state, RequestState::Refreshing, &method, &url);

                let rejected = token.take().unwrap_or_default();
                token = Some(self.token_manager.refresh_rejected(&rejected).await?);
                auth_retries += 1;
                continue;
            }

            transition(&mut state, RequestState::OtherError, &method, &url);
            return Err(map_api_error(status.as_u16(), &text));
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> AppResult<Response> {
        let device_id = self.device_ids.device_id().await;
        let mut builder = self.http.request(method.clone(), url);

        builder = match token {
            Some(token) => header_utils::apply_auth_headers(builder, token, device_id.as_deref()),
            None => header_utils::apply_device_binding_headers(builder, device_id.as_deref()),
        };
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            let err = AppError::from(e);
            debug!("{} {} failed before a response: {}", method, url, err);
            err
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn transition(state: &mut RequestState, next: RequestState, method: &Method, url: &str) {
    debug!("{} {}: {:?} -> {:?}", method, url, state, next);
    *state = next;
}
