//! # Relay Handler
//!
//! Forwards one chunk to a resumable session URL so the browser never talks to
//! the storage host directly. The chunk is buffered in memory and PUT with a
//! `Content-Range` derived from the `x-start`/`x-end`/`x-total` headers.
//!
//! The provider's status, `Range` header and body are returned as-is. A
//! `308 Resume Incomplete` with `Range: bytes=0-N` tells the browser to send
//! the next chunk from `N + 1`.
//!
//! Only session URLs under the configured prefix are forwarded to.

use worker::Request;

use crate::config::Config;
use crate::constants::HEADER_RANGE;
use crate::drive::put_chunk;
use crate::errors::AppResult;
use crate::log_data;
use crate::logging::{fingerprint, Logger};
use crate::middleware::ValidationMiddleware;
use crate::models::{ChunkDescriptor, RelayOutcome};
use crate::responses::{self, HttpResponse};
use crate::transport::{FetchTransport, HttpTransport};
use crate::utils::header_value;

/// Worker adapter for `POST /api/relay`.
pub async fn handle_relay(
    mut req: Request,
    config: &Config,
    logger: &Logger,
) -> AppResult<HttpResponse> {
    let chunk = accept_chunk(|name| header_value(&req, name), config)?;
    let bytes = req.bytes().await?;

    let outcome = relay_chunk(&chunk, bytes, &FetchTransport, logger).await?;
    outcome_response(outcome)
}

/// Reads the addressing headers and checks the session URL, before any body
/// is buffered.
pub fn accept_chunk<F>(header: F, config: &Config) -> AppResult<ChunkDescriptor>
where
    F: Fn(&str) -> Option<String>,
{
    let chunk = ValidationMiddleware::validate_chunk_headers(header)?;
    ValidationMiddleware::validate_upload_url(&chunk.upload_url, &config.relay_url_prefix)?;
    Ok(chunk)
}

/// PUTs the chunk to its session URL and returns the provider's reply.
pub async fn relay_chunk(
    chunk: &ChunkDescriptor,
    bytes: Vec<u8>,
    transport: &dyn HttpTransport,
    logger: &Logger,
) -> AppResult<RelayOutcome> {
    let length = bytes.len();
    let outcome = put_chunk(transport, chunk, bytes).await?;

    logger.info(
        "Chunk relayed",
        log_data!(
            "session" => fingerprint(&chunk.upload_url),
            "content_range" => chunk.content_range(),
            "bytes" => length,
            "status" => outcome.status,
            "range" => outcome.range.clone()
        ),
    );

    Ok(outcome)
}

/// Mirrors the provider's status, `Range` header and body.
pub(crate) fn outcome_response(outcome: RelayOutcome) -> AppResult<HttpResponse> {
    let mut response = responses::with_status(outcome.status, outcome.body);
    if let Some(range) = outcome.range {
        responses::set_header(&mut response, HEADER_RANGE, &range)?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::transport::testing::{reply, RecordingTransport};
    use futures::executor::block_on;

    const SESSION: &str = "https://www.googleapis.com/upload/drive/v3/files?upload_id=abc";

    fn chunk(start: u64, end_exclusive: u64, total: u64) -> ChunkDescriptor {
        ChunkDescriptor {
            upload_url: SESSION.into(),
            start,
            end_exclusive,
            total,
        }
    }

    fn logger() -> Logger {
        Logger::new("test".into())
    }

    fn relay_headers(upload_url: &'static str) -> impl Fn(&str) -> Option<String> {
        move |name| {
            let value = match name {
                "x-upload-url" => Some(upload_url),
                "x-start" => Some("0"),
                "x-end" => Some("100"),
                "x-total" => Some("1000"),
                _ => None,
            };
            value.map(str::to_string)
        }
    }

    #[test]
    fn accepts_session_under_allowed_prefix() {
        let accepted = accept_chunk(relay_headers(SESSION), &Config::default()).unwrap();
        assert_eq!(accepted, chunk(0, 100, 1000));
    }

    #[test]
    fn refuses_to_relay_to_foreign_hosts() {
        let err = accept_chunk(
            relay_headers("https://collector.example/steal"),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn allowed_prefix_is_configurable() {
        let config = Config {
            relay_url_prefix: "http://localhost:9000/upload/".into(),
            ..Config::default()
        };
        assert!(accept_chunk(relay_headers("http://localhost:9000/upload/s1"), &config).is_ok());
        assert_eq!(
            accept_chunk(relay_headers(SESSION), &config)
                .unwrap_err()
                .status_code(),
            403
        );
    }

    #[test]
    fn resume_incomplete_response_carries_status_and_range() {
        let response = outcome_response(RelayOutcome {
            status: 308,
            range: Some("bytes=0-99".into()),
            body: String::new(),
        })
        .unwrap();

        assert_eq!(response.status(), 308);
        assert_eq!(response.headers()["range"], "bytes=0-99");
        assert!(response.body().is_empty());
    }

    #[test]
    fn completed_upload_response_mirrors_provider_body() {
        let file = r#"{"kind":"drive#file","id":"1AbC"}"#;
        let response = outcome_response(RelayOutcome {
            status: 200,
            range: None,
            body: file.into(),
        })
        .unwrap();

        assert_eq!(response.status(), 200);
        assert!(response.headers().get("range").is_none());
        assert_eq!(response.body(), file);
    }

    #[test]
    fn first_chunk_sets_content_range_and_length() {
        let transport = RecordingTransport::replying(vec![reply(
            308,
            &[("range", "bytes=0-99")],
            "",
        )]);

        block_on(relay_chunk(&chunk(0, 100, 1000), vec![1u8; 100], &transport, &logger()))
            .unwrap();

        let sent = transport.request(0);
        assert_eq!(sent.method, http::Method::PUT);
        assert_eq!(sent.url, SESSION);
        assert_eq!(sent.headers["content-range"], "bytes 0-99/1000");
        assert_eq!(sent.headers["content-length"], "100");
        assert_eq!(sent.body, vec![1u8; 100]);
    }

    #[test]
    fn resume_incomplete_is_propagated_with_range() {
        let transport = RecordingTransport::replying(vec![reply(
            308,
            &[("range", "bytes=0-99")],
            "",
        )]);

        let outcome =
            block_on(relay_chunk(&chunk(0, 100, 1000), vec![0u8; 100], &transport, &logger()))
                .unwrap();

        assert_eq!(
            outcome,
            RelayOutcome {
                status: 308,
                range: Some("bytes=0-99".into()),
                body: String::new(),
            }
        );
    }

    #[test]
    fn final_chunk_returns_provider_body_verbatim() {
        let file = r#"{"kind":"drive#file","id":"1AbC","name":"movie.mp4"}"#;
        let transport = RecordingTransport::replying(vec![reply(200, &[], file)]);

        let outcome =
            block_on(relay_chunk(&chunk(900, 1000, 1000), vec![0u8; 100], &transport, &logger()))
                .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.range, None);
        assert_eq!(outcome.body, file);
    }

    #[test]
    fn provider_errors_are_not_rewritten() {
        let transport =
            RecordingTransport::replying(vec![reply(400, &[], "Failed to parse Content-Range header.")]);

        let outcome =
            block_on(relay_chunk(&chunk(0, 10, 5), vec![0u8; 10], &transport, &logger())).unwrap();

        assert_eq!(outcome.status, 400);
        assert_eq!(outcome.body, "Failed to parse Content-Range header.");
    }

    #[test]
    fn body_length_is_forwarded_as_received() {
        let transport = RecordingTransport::replying(vec![reply(308, &[], "")]);

        block_on(relay_chunk(&chunk(0, 100, 1000), vec![0u8; 42], &transport, &logger()))
            .unwrap();

        let sent = transport.request(0);
        assert_eq!(sent.headers["content-length"], "42");
        assert_eq!(sent.headers["content-range"], "bytes 0-99/1000");
    }

    #[test]
    fn transport_failure_is_an_error() {
        let transport = RecordingTransport::failing(AppError::Internal("dns failure".into()));

        let err = block_on(relay_chunk(&chunk(0, 1, 1), vec![0u8], &transport, &logger()))
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
