//! # Response Building
//!
//! Handlers, CORS and error conversion build `http::Response<String>` values.
//! The status and header decisions therefore run natively in tests, and the
//! router converts the result into a Worker `Response` once, at the edge.

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;

use crate::errors::{AppError, AppResult};

pub type HttpResponse = http::Response<String>;

/// Response with `status` and a raw body. An unknown status becomes 502.
pub fn with_status(status: u16, body: String) -> HttpResponse {
    let mut response = http::Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    response
}

pub fn empty(status: u16) -> HttpResponse {
    with_status(status, String::new())
}

/// JSON response with `Content-Type: application/json`.
pub fn json<T: Serialize>(status: u16, value: &T) -> AppResult<HttpResponse> {
    let mut response = with_status(status, serde_json::to_string(value)?);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Sets a header whose value is only known at runtime.
pub fn set_header(response: &mut HttpResponse, name: &str, value: &str) -> AppResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid header name {name}: {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(format!("invalid value for {name}: {e}")))?;
    response.headers_mut().insert(header_name, header_value);
    Ok(())
}

/// Converts a built response into a Worker response.
pub fn into_worker(response: HttpResponse) -> worker::Result<worker::Response> {
    let (parts, body) = response.into_parts();

    // Null-body statuses such as 204 and 308 reject a body, even an empty one.
    let mut converted = if body.is_empty() {
        worker::Response::empty()?
    } else {
        worker::Response::ok(body)?
    }
    .with_status(parts.status.as_u16());

    let headers = converted.headers_mut();
    for (name, value) in parts.headers.iter() {
        let value = value
            .to_str()
            .map_err(|e| worker::Error::RustError(format!("header {name}: {e}")))?;
        headers.set(name.as_str(), value)?;
    }
    Ok(converted)
}
