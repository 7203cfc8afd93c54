//! # Configuration Management
//!
//! This module provides configuration management for the upload relay.
//! Configuration is read from Worker vars and secrets once per isolate and
//! shared with every request through an `Arc`.
//!
//! ## Configuration Options
//!
//! - `drive_folder_id`: Drive folder that receives new files (required by init only)
//! - `allowed_origin`: Value echoed in `Access-Control-Allow-Origin` (default: `*`)
//! - `service_account_json`: Service account key JSON used for token exchange
//! - `max_file_size`: Maximum declared file size in bytes (default: 5GB)
//! - `upload_endpoint`: Drive endpoint creating resumable sessions
//! - `relay_url_prefix`: Session URLs the relay may forward to
//!
//! Loading never fails. Settings only one endpoint needs are checked by that
//! endpoint, so a bad value cannot take down preflights or the other endpoint.
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = Config::from_env(&env);
//! println!("Max file size: {} bytes", config.require_max_file_size()?);
//! ```

use crate::constants::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_MAX_FILE_SIZE, DEFAULT_RELAY_URL_PREFIX,
    DRIVE_RESUMABLE_UPLOAD_URL, ENV_ALLOWED_ORIGIN, ENV_DRIVE_FOLDER_ID, ENV_MAX_UPLOAD_BYTES,
    ENV_RELAY_URL_PREFIX, ENV_SERVICE_ACCOUNT, ENV_UPLOAD_ENDPOINT,
};
use crate::errors::{AppError, AppResult};
use worker::Env;

/// Configuration structure for the upload relay.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Target Drive folder ID. Init refuses to run without it.
    pub drive_folder_id: Option<String>,

    /// Allowed CORS origin echoed on every response.
    pub allowed_origin: String,

    /// Raw service account key JSON. Parsed when a token is requested.
    pub service_account_json: Option<String>,

    /// Maximum allowed file size in bytes.
    /// Init requests declaring a larger size are rejected with 413.
    pub max_file_size: u64,

    /// Parse error of a `MAX_UPLOAD_BYTES` value that is not an unsigned integer.
    pub max_file_size_error: Option<String>,

    /// Endpoint that creates resumable upload sessions.
    pub upload_endpoint: String,

    /// Prefix every relayed `x-upload-url` must start with.
    pub relay_url_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drive_folder_id: None,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            service_account_json: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_size_error: None,
            upload_endpoint: DRIVE_RESUMABLE_UPLOAD_URL.to_string(),
            relay_url_prefix: DEFAULT_RELAY_URL_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the Worker environment.
    ///
    /// Secrets take precedence over plain vars with the same name so the
    /// service account key can be stored with `wrangler secret put`.
    pub fn from_env(env: &Env) -> Self {
        Self::from_lookup(|key| {
            env.secret(key)
                .map(|secret| secret.to_string())
                .or_else(|_| env.var(key).map(|var| var.to_string()))
                .ok()
        })
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset. A `MAX_UPLOAD_BYTES` value that is
    /// not an unsigned integer is kept as an error for init to report.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();

        let (max_file_size, max_file_size_error) = match read(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(size) => (size, None),
                Err(e) => (defaults.max_file_size, Some(format!("{raw:?}: {e}"))),
            },
            None => (defaults.max_file_size, None),
        };

        Self {
            drive_folder_id: read(ENV_DRIVE_FOLDER_ID),
            allowed_origin: read(ENV_ALLOWED_ORIGIN).unwrap_or(defaults.allowed_origin),
            service_account_json: read(ENV_SERVICE_ACCOUNT),
            max_file_size,
            max_file_size_error,
            upload_endpoint: read(ENV_UPLOAD_ENDPOINT).unwrap_or(defaults.upload_endpoint),
            relay_url_prefix: read(ENV_RELAY_URL_PREFIX).unwrap_or(defaults.relay_url_prefix),
        }
    }

    /// Returns the target folder or a typed configuration error.
    pub fn require_folder_id(&self) -> AppResult<&str> {
        self.drive_folder_id
            .as_deref()
            .ok_or(AppError::MissingConfig(ENV_DRIVE_FOLDER_ID))
    }

    /// Returns the size limit, or the error of a malformed `MAX_UPLOAD_BYTES`.
    pub fn require_max_file_size(&self) -> AppResult<u64> {
        match &self.max_file_size_error {
            Some(reason) => Err(AppError::InvalidConfig {
                key: ENV_MAX_UPLOAD_BYTES,
                reason: reason.clone(),
            }),
            None => Ok(self.max_file_size),
        }
    }
}
