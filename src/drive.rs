//! # Google Drive Resumable Upload Client
//!
//! Thin wrapper over the two provider calls the service makes:
//!
//! - creating a resumable upload session for a file in the target folder
//! - PUTting one byte range to an existing session URL ([`put_chunk`])
//!
//! The session URL is treated as an opaque forwarding address.

use http::Method;

use crate::constants::HEADER_RANGE;
use crate::errors::{AppError, AppResult};
use crate::models::{ChunkDescriptor, DriveFileMetadata, RelayOutcome, UploadIntent};
use crate::transport::{HttpTransport, OutboundRequest};

pub struct DriveClient<'a> {
    transport: &'a dyn HttpTransport,
    upload_endpoint: &'a str,
}

impl<'a> DriveClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, upload_endpoint: &'a str) -> Self {
        Self {
            transport,
            upload_endpoint,
        }
    }

    /// Starts a resumable session and returns the session URL from `Location`.
    ///
    /// A non-2xx reply becomes [`AppError::Upstream`] carrying the provider's
    /// status and body text.
    pub async fn create_resumable_session(
        &self,
        access_token: &str,
        folder_id: &str,
        intent: &UploadIntent,
    ) -> AppResult<String> {
        let metadata = DriveFileMetadata {
            name: &intent.name,
            parents: [folder_id],
            mime_type: &intent.mime_type,
        };

        let request = OutboundRequest::new(Method::POST, self.upload_endpoint)
            .header("authorization", &format!("Bearer {access_token}"))?
            .header("content-type", "application/json; charset=UTF-8")?
            .header("x-upload-content-type", &intent.mime_type)?
            .header("x-upload-content-length", &intent.size.to_string())?
            .body(serde_json::to_vec(&metadata)?);

        let reply = self.transport.send(request).await?;
        if !reply.is_success() {
            return Err(AppError::Upstream {
                status: reply.status,
                message: "Failed to init".to_string(),
                details: reply.body,
            });
        }

        reply
            .header("location")
            .filter(|location| !location.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::BadGateway("Provider response missing Location header".to_string())
            })
    }
}

/// PUTs one chunk to its session URL and captures the reply verbatim.
///
/// No provider status is treated as an error here: `308`, `4xx` and `5xx`
/// replies are all returned for the caller to act on.
pub async fn put_chunk(
    transport: &dyn HttpTransport,
    chunk: &ChunkDescriptor,
    bytes: Vec<u8>,
) -> AppResult<RelayOutcome> {
    let request = OutboundRequest::new(Method::PUT, chunk.upload_url.as_str())
        .header("content-length", &bytes.len().to_string())?
        .header("content-range", &chunk.content_range())?
        .body(bytes);

    let reply = transport.send(request).await?;

    Ok(RelayOutcome {
        status: reply.status,
        range: reply.header(HEADER_RANGE).map(str::to_string),
        body: reply.body,
    })
}
