//! # Application Constants
//!
//! This module defines application-wide constants used throughout the upload relay.
//! Centralizing constants keeps the wire contract with the browser client and the
//! storage provider in one place.
//!
//! ## Environment Keys
//!
//! Names of the Worker vars and secrets that must match `wrangler.toml`.
//!
//! ## Provider Endpoints
//!
//! Google Drive resumable upload and OAuth 2.0 token endpoints.
//!
//! ## Headers
//!
//! Custom request headers accepted by the relay endpoint and the CORS values
//! advertised by each endpoint.

/// Worker var holding the target Drive folder ID
pub const ENV_DRIVE_FOLDER_ID: &str = "DRIVE_FOLDER_ID";

/// Worker var holding the allowed CORS origin
pub const ENV_ALLOWED_ORIGIN: &str = "ALLOWED_ORIGIN";

/// Worker secret holding the service account key JSON
pub const ENV_SERVICE_ACCOUNT: &str = "GOOGLE_SERVICE_ACCOUNT";

/// Optional Worker var overriding the maximum declared file size
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";

/// Optional Worker var overriding the resumable session endpoint
pub const ENV_UPLOAD_ENDPOINT: &str = "DRIVE_UPLOAD_ENDPOINT";

/// Optional Worker var restricting which session URLs the relay forwards to
pub const ENV_RELAY_URL_PREFIX: &str = "RELAY_ALLOWED_PREFIX";

/// Default allowed CORS origin
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Default maximum file size (5GB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Session URLs the relay forwards to by default
pub const DEFAULT_RELAY_URL_PREFIX: &str = "https://www.googleapis.com/upload/";

/// OAuth scope granting access to files the service account creates
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Drive endpoint that creates a resumable upload session
pub const DRIVE_RESUMABLE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable";

/// Token endpoint used when the service account key does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Grant type for the OAuth 2.0 JWT bearer flow
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed token assertion in seconds
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Init endpoint path
pub const INIT_PATH: &str = "/api/init";

/// Relay endpoint path
pub const RELAY_PATH: &str = "/api/relay";

/// Health check path
pub const HEALTH_PATH: &str = "/health";

/// HTTP header carrying the resumable session URL
pub const HEADER_UPLOAD_URL: &str = "x-upload-url";

/// HTTP header carrying the first byte offset of the chunk
pub const HEADER_START: &str = "x-start";

/// HTTP header carrying the exclusive end offset of the chunk
pub const HEADER_END: &str = "x-end";

/// HTTP header carrying the total file size
pub const HEADER_TOTAL: &str = "x-total";

/// Provider header reporting the bytes persisted so far
pub const HEADER_RANGE: &str = "Range";

/// CORS methods accepted by both endpoints
pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

/// CORS headers accepted by the init endpoint
pub const CORS_INIT_ALLOW_HEADERS: &str = "Content-Type, X-Upload-Token";

/// CORS headers accepted by the relay endpoint
pub const CORS_RELAY_ALLOW_HEADERS: &str = "Content-Type, x-upload-url, x-start, x-end, x-total";

/// Response headers the relay endpoint exposes to browser scripts
pub const CORS_RELAY_EXPOSE_HEADERS: &str = "Range";
