//! # Request Routing and Dispatch
//!
//! This module routes incoming requests by path and HTTP method.
//!
//! ## Supported Routes
//!
//! - `POST /api/init` - Create a resumable upload session
//! - `POST /api/relay` - Forward one chunk to a session URL
//! - `OPTIONS /api/init`, `OPTIONS /api/relay` - CORS preflight
//! - `GET /health` - Health check endpoint
//!
//! Other methods on the two API paths yield 405, other paths 404. Every API
//! response carries the CORS headers of its endpoint, errors included.

use std::future::Future;
use std::sync::Arc;
use worker::*;

use crate::config::Config;
use crate::constants::{HEALTH_PATH, INIT_PATH, RELAY_PATH};
use crate::errors::{AppError, AppResult};
use crate::handlers::{dispatch, handle_health_check, handle_not_found};
use crate::log_data;
use crate::logging::Logger;
use crate::middleware::{CorsMiddleware, CorsPolicy};
use crate::responses::{into_worker, HttpResponse};
use crate::utils::generate_request_id;

/// The two API endpoints exposed to the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Init,
    Relay,
}

/// Outcome of matching a method and path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Preflight(Endpoint),
    Invoke(Endpoint),
    MethodNotAllowed(Endpoint),
    Health,
    NotFound,
}

/// Resolves a request method and path to a route.
pub fn resolve(method: &Method, path: &str) -> Route {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };

    let endpoint = match path {
        INIT_PATH => Endpoint::Init,
        RELAY_PATH => Endpoint::Relay,
        HEALTH_PATH if *method == Method::Get => return Route::Health,
        _ => return Route::NotFound,
    };

    match method {
        Method::Options => Route::Preflight(endpoint),
        Method::Post => Route::Invoke(endpoint),
        _ => Route::MethodNotAllowed(endpoint),
    }
}

/// Handles incoming HTTP requests and routes them to appropriate handlers.
pub async fn handle_request(req: Request, config: Arc<Config>) -> Result<Response> {
    let url = req.url()?;
    let method = req.method();
    let route = resolve(&method, url.path());

    let logger = Logger::new(generate_request_id());
    logger.info(
        "Routing request",
        log_data!(
            "method" => method.to_string(),
            "path" => url.path(),
            "route" => format!("{:?}", route)
        ),
    );

    let response =
        respond(route, &config, |endpoint| dispatch(req, endpoint, &config, &logger)).await;
    into_worker(response)
}

/// Builds the response for a resolved route.
///
/// `invoke` runs the endpoint handler and is only called for `Invoke`.
/// Preflights, 405s and handler results, failures included, get the
/// endpoint's CORS headers.
pub async fn respond<F, Fut>(route: Route, config: &Config, invoke: F) -> HttpResponse
where
    F: FnOnce(Endpoint) -> Fut,
    Fut: Future<Output = AppResult<HttpResponse>>,
{
    let endpoint = match route {
        Route::Preflight(endpoint)
        | Route::Invoke(endpoint)
        | Route::MethodNotAllowed(endpoint) => endpoint,
        Route::Health => return handle_health_check().unwrap_or_else(|e| e.to_response()),
        Route::NotFound => return handle_not_found(),
    };
    let policy = CorsPolicy::for_endpoint(endpoint, config);

    let result = match route {
        Route::Preflight(_) => CorsMiddleware::handle_preflight(&policy),
        Route::Invoke(_) => invoke(endpoint).await,
        _ => Err(AppError::MethodNotAllowed),
    };

    let response = result.unwrap_or_else(|e| e.to_response());
    CorsMiddleware::apply_headers(response, &policy).unwrap_or_else(|e| e.to_response())
}
