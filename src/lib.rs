//! # Drive Relay - Cloudflare Workers
//!
//! Lets a browser upload large files to Google Drive through the resumable
//! upload protocol without the file bytes passing through an application
//! backend for session creation.
//!
//! ## Architecture
//!
//! - **Router**: Resolves method and path to an endpoint, answers preflights
//! - **Middleware**: CORS headers and request validation
//! - **Handlers**: Init (session creation) and Relay (chunk forwarding)
//! - **Auth**: Service account token exchange behind `TokenProvider`
//! - **Drive**: Provider calls over an `HttpTransport`
//!
//! ## Endpoints
//!
//! ```text
//! POST /api/init    {name, mimeType, size} -> {ok, uploadUrl}
//! POST /api/relay   x-upload-url, x-start, x-end, x-total + raw chunk
//! GET  /health
//! ```
//!
//! Both API endpoints are stateless. Chunk ordering and resumption are left to
//! the provider's session: a `308` reply with a `Range` header tells the
//! browser where to continue.

use std::sync::{Arc, OnceLock};
use worker::*;

mod auth;
mod config;
mod constants;
mod drive;
mod errors;
mod handlers;
mod logging;
mod middleware;
mod models;
mod responses;
mod router;
mod transport;
mod utils;

use config::Config;
use constants::ENV_MAX_UPLOAD_BYTES;

static CONFIG_CACHE: OnceLock<Arc<Config>> = OnceLock::new();

/// Main entry point for the Cloudflare Worker.
///
/// Sets up panic reporting, loads configuration once per isolate and
/// delegates to the router.
#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    router::handle_request(req, load_config(&env)).await
}

fn load_config(env: &Env) -> Arc<Config> {
    CONFIG_CACHE
        .get_or_init(|| {
            let config = Config::from_env(env);
            if let Some(reason) = &config.max_file_size_error {
                console_warn!("Invalid {} {}; init will fail", ENV_MAX_UPLOAD_BYTES, reason);
            }
            Arc::new(config)
        })
        .clone()
}
