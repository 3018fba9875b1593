use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Error body shape shared by the auth and trading services
#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

fn envelope_message(value: &Value) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_value(value.clone()).ok()?;
    envelope.error.or(envelope.message).filter(|m| !m.is_empty())
}

/// Map a non-success HTTP status and its body to an AppError.
pub fn map_api_error(status_code: u16, response_text: &str) -> AppError {
    debug!(
        "Mapping API error: status={}, response={}",
        status_code, response_text
    );

    let message = serde_json::from_str::<Value>(response_text)
        .ok()
        .and_then(|json| envelope_message(&json))
        .unwrap_or_else(|| {
            if response_text.trim().is_empty() {
                format!("HTTP {status_code}")
            } else {
                response_text.to_string()
            }
        });

    match status_code {
        400 | 409 | 422 => AppError::ValidationError(message),
        401 => AppError::AuthError(format!("Authentication failed: {message}")),
        403 => AppError::AccessDenied(message),
        404 => AppError::NotFoundError(message),
        429 => AppError::ExternalServiceError(format!("Rate limit exceeded: {message}")),
        500..=599 => AppError::ExternalServiceError(format!("Server error: {message}")),
        _ => AppError::ExternalServiceError(format!(
            "Unexpected response ({status_code}): {message}"
        )),
    }
}

/// Decode a 2xx body as `{ "success": bool, ... }`.
///
/// `success: false` becomes a `ValidationError` carrying the server's
/// `error`/`message`; a body without the flag is an `InvalidResponse`. An empty
/// body decodes as JSON `null`, which suits `()` and `Option<_>` targets.
pub fn decode_envelope<T: DeserializeOwned>(response_text: &str) -> AppResult<T> {
    if response_text.trim().is_empty() {
        return serde_json::from_value(Value::Null)
            .map_err(|_| AppError::InvalidResponse("Empty response body".to_string()));
    }

    let json: Value = serde_json::from_str(response_text)
        .map_err(|e| AppError::InvalidResponse(format!("Response is not JSON: {e}")))?;

    let Some(success) = json.get("success").and_then(Value::as_bool) else {
        return Err(AppError::InvalidResponse(
            "Malformed response envelope: missing success flag".to_string(),
        ));
    };

    if !success {
        let message =
            envelope_message(&json).unwrap_or_else(|| "Request was rejected".to_string());
        return Err(AppError::ValidationError(message));
    }

    serde_json::from_value(json)
        .map_err(|e| AppError::InvalidResponse(format!("Failed to parse response: {e}")))
}
