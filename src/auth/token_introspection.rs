use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use log::debug;

/// Read the `exp` claim of a JWT without verifying it.
///
/// Used only to place an expiry on grants that omit `expiresIn`; opaque tokens
/// return `None`.
pub fn decode_exp(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        debug!("Access token is not a JWT, no exp claim available");
        return None;
    };

    let decoded = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to decode JWT payload: {}", e);
            return None;
        }
    };

    let json: serde_json::Value = match serde_json::from_slice(&decoded) {
        Ok(j) => j,
        Err(e) => {
            debug!("Failed to parse JWT payload JSON: {}", e);
            return None;
        }
    };

    let exp = json.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}
