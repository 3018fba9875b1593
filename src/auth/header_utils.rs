use reqwest::RequestBuilder;

use crate::constants::{HEADER_DEVICE_ID, HEADER_TOKEN_BINDING};

/// Applies device binding headers (x-device-id and X-Token-Binding) to a request.
pub fn apply_device_binding_headers(builder: RequestBuilder, device_id: Option<&str>) -> RequestBuilder {
    match device_id {
        Some(id) => builder
            .header(HEADER_DEVICE_ID, id)
            .header(HEADER_TOKEN_BINDING, id),
        None => builder,
    }
}

/// Applies both authorization and device binding headers to a request.
pub fn apply_auth_headers(
    builder: RequestBuilder,
    token: &str,
    device_id: Option<&str>,
) -> RequestBuilder {
    let builder = builder.bearer_auth(token);
    apply_device_binding_headers(builder, device_id)
}
