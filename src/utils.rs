//! # Utility Functions
//!
//! Small helpers shared by the router and handlers: request identifiers and
//! header access on Worker requests.

use chrono::Utc;
use uuid::Uuid;
use worker::Request;

/// Generates a unique identifier for correlating the log lines of one request.
///
/// Format: `{timestamp_millis}-{uuid_v4}`, sortable by creation time.
pub fn generate_request_id() -> String {
    let uuid_part = Uuid::new_v4().to_string();
    let timestamp = Utc::now().timestamp_millis();
    format!("{}-{}", timestamp, uuid_part)
}

/// Reads a request header, treating lookup failures as absence.
pub fn header_value(req: &Request, name: &str) -> Option<String> {
    req.headers().get(name).ok().flatten()
}
