//! # Middleware Components
//!
//! This module provides the cross-cutting request/response processing shared by
//! the init and relay endpoints.
//!
//! ## Middleware Types
//!
//! - **CORS Middleware**: Preflight answers and CORS headers on every response
//! - **Validation Middleware**: Declared size limits, relay addressing headers
//!   and allowed session URLs
//!
//! ## Usage Examples
//!
//! ```rust,ignore
//! let cors = CorsPolicy::for_endpoint(Endpoint::Relay, &config);
//!
//! if req.method() == Method::Options {
//!     return CorsMiddleware::handle_preflight(&cors);
//! }
//!
//! let chunk = ValidationMiddleware::validate_chunk_headers(|name| header(&req, name))?;
//! ValidationMiddleware::validate_upload_url(&chunk.upload_url, &config.relay_url_prefix)?;
//! ```

use crate::config::Config;
use crate::constants::{
    CORS_ALLOW_METHODS, CORS_INIT_ALLOW_HEADERS, CORS_RELAY_ALLOW_HEADERS,
    CORS_RELAY_EXPOSE_HEADERS, HEADER_END, HEADER_START, HEADER_TOTAL, HEADER_UPLOAD_URL,
};
use crate::errors::{AppError, AppResult};
use crate::models::ChunkDescriptor;
use crate::responses::{self, HttpResponse};
use crate::router::Endpoint;
use serde_json::Number;

const MISSING_CHUNK_HEADERS: &str = "Missing x-upload-url/x-start/x-end/x-total";
const FILE_TOO_LARGE: &str = "File too large";

/// CORS headers advertised by one endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CorsPolicy {
    pub allow_origin: String,
    pub allow_methods: &'static str,
    pub allow_headers: &'static str,
    pub expose_headers: Option<&'static str>,
}

impl CorsPolicy {
    pub fn for_endpoint(endpoint: Endpoint, config: &Config) -> Self {
        let (allow_headers, expose_headers) = match endpoint {
            Endpoint::Init => (CORS_INIT_ALLOW_HEADERS, None),
            Endpoint::Relay => (CORS_RELAY_ALLOW_HEADERS, Some(CORS_RELAY_EXPOSE_HEADERS)),
        };
        Self {
            allow_origin: config.allowed_origin.clone(),
            allow_methods: CORS_ALLOW_METHODS,
            allow_headers,
            expose_headers,
        }
    }

    /// Header pairs in the order they are written to responses.
    pub fn header_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("Access-Control-Allow-Origin", self.allow_origin.as_str()),
            ("Access-Control-Allow-Methods", self.allow_methods),
            ("Access-Control-Allow-Headers", self.allow_headers),
        ];
        if let Some(expose) = self.expose_headers {
            pairs.push(("Access-Control-Expose-Headers", expose));
        }
        pairs
    }
}

/// Middleware for handling Cross-Origin Resource Sharing (CORS) requests.
///
/// The browser uploader runs on a different origin than the Worker, so every
/// response, including errors and 405s, carries the endpoint's CORS headers.
pub struct CorsMiddleware;

impl CorsMiddleware {
    /// Adds the policy's CORS headers to an existing response.
    ///
    /// Headers are set in place so `Content-Type` and a relayed `Range`
    /// survive.
    pub fn apply_headers(
        mut response: HttpResponse,
        policy: &CorsPolicy,
    ) -> AppResult<HttpResponse> {
        for (name, value) in policy.header_pairs() {
            responses::set_header(&mut response, name, value)?;
        }
        Ok(response)
    }

    /// Answers a preflight request with `204 No Content`.
    pub fn handle_preflight(policy: &CorsPolicy) -> AppResult<HttpResponse> {
        Self::apply_headers(responses::empty(204), policy)
    }
}

/// Middleware for validating request parameters and headers.
pub struct ValidationMiddleware;

impl ValidationMiddleware {
    /// Validates and extracts the relay addressing headers.
    ///
    /// # Required Headers
    ///
    /// - `x-upload-url`: Resumable session URL returned by init
    /// - `x-start`: First byte offset of the chunk
    /// - `x-end`: Exclusive end offset of the chunk
    /// - `x-total`: Total file size
    ///
    /// # Errors
    ///
    /// - `BadRequest`: If a header is missing or an offset is not an unsigned integer
    /// - `BadRequest`: If `x-end` does not exceed `x-start`
    pub fn validate_chunk_headers<F>(header: F) -> AppResult<ChunkDescriptor>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = || AppError::BadRequest(MISSING_CHUNK_HEADERS.to_string());
        let offset = |name: &str| {
            header(name)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .ok_or_else(missing)
        };

        let upload_url = header(HEADER_UPLOAD_URL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(missing)?;
        let start = offset(HEADER_START)?;
        let end_exclusive = offset(HEADER_END)?;
        let total = offset(HEADER_TOTAL)?;

        if end_exclusive <= start {
            return Err(AppError::BadRequest(format!(
                "{HEADER_END} must be greater than {HEADER_START}"
            )));
        }

        Ok(ChunkDescriptor {
            upload_url,
            start,
            end_exclusive,
            total,
        })
    }

    /// Rejects session URLs outside the configured prefix so the relay cannot
    /// be pointed at arbitrary hosts.
    pub fn validate_upload_url(upload_url: &str, allowed_prefix: &str) -> AppResult<()> {
        if !upload_url.starts_with(allowed_prefix) {
            return Err(AppError::Forbidden(format!(
                "{HEADER_UPLOAD_URL} is not an allowed upload session"
            )));
        }
        Ok(())
    }

    /// Validates that a declared file size is within configured limits.
    pub fn validate_file_size(size: u64, max_size: u64) -> AppResult<()> {
        if size > max_size {
            return Err(AppError::PayloadTooLarge(FILE_TOO_LARGE.to_string()));
        }
        Ok(())
    }

    /// Validates a declared size exactly as the JSON body wrote it.
    ///
    /// A number above the limit is too large whatever its notation: float,
    /// exponent or beyond `u64`. Within the limit only non-negative integers
    /// are accepted.
    pub fn validate_declared_size(size: &Number, max_size: u64) -> AppResult<u64> {
        if let Some(size) = size.as_u64() {
            Self::validate_file_size(size, max_size)?;
            return Ok(size);
        }
        if size.as_f64().is_some_and(|value| value > max_size as f64) {
            return Err(AppError::PayloadTooLarge(FILE_TOO_LARGE.to_string()));
        }
        Err(AppError::BadRequest("size must be a non-negative integer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn headers(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn full_headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("x-upload-url", "https://upload.example/session"),
            ("x-start", "0"),
            ("x-end", "100"),
            ("x-total", "1000"),
        ]
    }

    #[test]
    fn validate_file_size_allows_within_limit() {
        assert!(ValidationMiddleware::validate_file_size(5 * GIB, 5 * GIB).is_ok());
    }

    #[test]
    fn validate_file_size_rejects_over_limit() {
        let err = ValidationMiddleware::validate_file_size(6 * GIB, 5 * GIB).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(err.status_code(), 413);
    }

    fn number(raw: &str) -> Number {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn declared_size_above_limit_is_too_large_in_any_notation() {
        for raw in ["1e20", "18446744073709551616", "6442450944.0", "5368709120.5"] {
            let err = ValidationMiddleware::validate_declared_size(&number(raw), 5 * GIB)
                .unwrap_err();
            assert_eq!(err.status_code(), 413, "size {raw}");
        }
    }

    #[test]
    fn declared_size_within_limit_must_be_a_non_negative_integer() {
        for raw in ["-1", "1.5", "-1e20", "5368709119.5"] {
            let err = ValidationMiddleware::validate_declared_size(&number(raw), 5 * GIB)
                .unwrap_err();
            assert_eq!(err.status_code(), 400, "size {raw}");
        }
        assert_eq!(
            ValidationMiddleware::validate_declared_size(&number("5368709120"), 5 * GIB).unwrap(),
            5 * GIB
        );
    }

    #[test]
    fn upload_url_must_match_allowed_prefix() {
        let prefix = "https://www.googleapis.com/upload/";
        assert!(ValidationMiddleware::validate_upload_url(
            "https://www.googleapis.com/upload/drive/v3/files?upload_id=abc",
            prefix
        )
        .is_ok());

        for url in [
            "https://attacker.example/upload/",
            "http://www.googleapis.com/upload/drive/v3/files",
            "https://www.googleapis.com.attacker.example/upload/",
        ] {
            let err = ValidationMiddleware::validate_upload_url(url, prefix).unwrap_err();
            assert_eq!(err.status_code(), 403, "{url}");
        }
    }

    #[test]
    fn chunk_headers_parse_into_descriptor() {
        let chunk = ValidationMiddleware::validate_chunk_headers(headers(&full_headers())).unwrap();
        assert_eq!(
            chunk,
            ChunkDescriptor {
                upload_url: "https://upload.example/session".into(),
                start: 0,
                end_exclusive: 100,
                total: 1000,
            }
        );
    }

    #[test]
    fn each_missing_chunk_header_is_rejected() {
        for skipped in ["x-upload-url", "x-start", "x-end", "x-total"] {
            let pairs: Vec<_> = full_headers()
                .into_iter()
                .filter(|(name, _)| *name != skipped)
                .collect();
            let err = ValidationMiddleware::validate_chunk_headers(headers(&pairs)).unwrap_err();
            assert_eq!(err.status_code(), 400, "missing {skipped}");
            assert_eq!(err.to_string(), MISSING_CHUNK_HEADERS);
        }
    }

    #[test]
    fn non_numeric_offsets_are_rejected() {
        for (name, bad) in [("x-start", "abc"), ("x-end", "-5"), ("x-total", "1e3")] {
            let pairs: Vec<_> = full_headers()
                .into_iter()
                .map(|(k, v)| if k == name { (k, bad) } else { (k, v) })
                .collect();
            let err = ValidationMiddleware::validate_chunk_headers(headers(&pairs)).unwrap_err();
            assert_eq!(err.status_code(), 400, "{name}={bad}");
        }
    }

    #[test]
    fn empty_range_is_rejected() {
        let err = ValidationMiddleware::validate_chunk_headers(headers(&[
            ("x-upload-url", "https://upload.example/session"),
            ("x-start", "100"),
            ("x-end", "100"),
            ("x-total", "1000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn relay_policy_lists_relay_headers_and_exposes_range() {
        let config = Config {
            allowed_origin: "https://app.example.com".into(),
            ..Config::default()
        };
        let policy = CorsPolicy::for_endpoint(Endpoint::Relay, &config);
        assert_eq!(
            policy.header_pairs(),
            vec![
                ("Access-Control-Allow-Origin", "https://app.example.com"),
                ("Access-Control-Allow-Methods", "POST, OPTIONS"),
                (
                    "Access-Control-Allow-Headers",
                    "Content-Type, x-upload-url, x-start, x-end, x-total"
                ),
                ("Access-Control-Expose-Headers", "Range"),
            ]
        );
    }

    #[test]
    fn init_policy_uses_default_origin() {
        let policy = CorsPolicy::for_endpoint(Endpoint::Init, &Config::default());
        assert_eq!(policy.allow_origin, "*");
        assert_eq!(policy.allow_headers, "Content-Type, X-Upload-Token");
        assert_eq!(policy.expose_headers, None);
    }

    #[test]
    fn preflight_is_no_content_with_cors_headers() {
        let policy = CorsPolicy::for_endpoint(Endpoint::Relay, &Config::default());
        let response = CorsMiddleware::handle_preflight(&policy).unwrap();

        assert_eq!(response.status(), 204);
        assert!(response.body().is_empty());
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, x-upload-url, x-start, x-end, x-total"
        );
        assert_eq!(headers["access-control-expose-headers"], "Range");
    }

    #[test]
    fn apply_headers_keeps_existing_headers() {
        let policy = CorsPolicy::for_endpoint(Endpoint::Init, &Config::default());
        let response =
            CorsMiddleware::apply_headers(AppError::NotFound.to_response(), &policy).unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert!(response.headers().get("access-control-expose-headers").is_none());
    }

    #[test]
    fn unusable_origin_is_an_error() {
        let config = Config {
            allowed_origin: "https://a.example\r\nX-Injected: 1".into(),
            ..Config::default()
        };
        let policy = CorsPolicy::for_endpoint(Endpoint::Init, &config);
        let err = CorsMiddleware::apply_headers(responses::empty(200), &policy).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
