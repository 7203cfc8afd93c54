//! # Handlers Module
//!
//! HTTP request handlers for the upload relay. Each endpoint has a pure core
//! working on plain values and a thin adapter reading the Worker request.
//! Failures are logged here; the router turns them into CORS-carrying
//! responses.

use worker::Request;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::log_data;
use crate::logging::Logger;
use crate::responses::{self, HttpResponse};
use crate::router::Endpoint;

pub mod init;
pub mod relay;

/// Runs the endpoint's handler and logs any failure.
pub async fn dispatch(
    req: Request,
    endpoint: Endpoint,
    config: &Config,
    logger: &Logger,
) -> AppResult<HttpResponse> {
    let result = match endpoint {
        Endpoint::Init => init::handle_init(req, config, logger).await,
        Endpoint::Relay => relay::handle_relay(req, config, logger).await,
    };

    if let Err(app_error) = &result {
        log_failure(logger, endpoint, app_error);
    }
    result
}

fn log_failure(logger: &Logger, endpoint: Endpoint, error: &AppError) {
    let data = log_data!(
        "endpoint" => format!("{:?}", endpoint),
        "status" => error.status_code(),
        "error" => error.to_string()
    );
    if error.status_code() >= 500 {
        logger.error("Request failed", data);
    } else {
        logger.warn("Request rejected", data);
    }
}

/// Provides a health check endpoint for monitoring and load balancers.
pub fn handle_health_check() -> AppResult<HttpResponse> {
    responses::json(
        200,
        &serde_json::json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }),
    )
}

/// Handles requests to unmatched routes with a 404 Not Found response.
pub fn handle_not_found() -> HttpResponse {
    AppError::NotFound.to_response()
}
