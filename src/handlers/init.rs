//! # Init Handler
//!
//! Creates a Drive resumable upload session for the declared file and returns
//! its URL. The browser then uploads the chunks through the relay endpoint.
//!
//! Checks run in a fixed order: request body, folder configuration, size
//! limit configuration, declared size, credential, provider call.

use worker::Request;

use crate::auth::{ServiceAccountTokenProvider, TokenProvider};
use crate::config::Config;
use crate::constants::DRIVE_FILE_SCOPE;
use crate::drive::DriveClient;
use crate::errors::AppResult;
use crate::log_data;
use crate::logging::{fingerprint, Logger};
use crate::models::{InitRequest, InitResponse};
use crate::responses::{self, HttpResponse};
use crate::transport::{FetchTransport, HttpTransport};

/// Worker adapter for `POST /api/init`.
pub async fn handle_init(
    mut req: Request,
    config: &Config,
    logger: &Logger,
) -> AppResult<HttpResponse> {
    let body = req.bytes().await?;
    let transport = FetchTransport;
    let tokens =
        ServiceAccountTokenProvider::new(config.service_account_json.as_deref(), &transport);

    let reply = initialize_upload(&body, config, &tokens, &transport, logger).await?;
    responses::json(200, &reply)
}

/// Validates the upload intent and opens a resumable session for it.
pub async fn initialize_upload(
    body: &[u8],
    config: &Config,
    tokens: &dyn TokenProvider,
    transport: &dyn HttpTransport,
    logger: &Logger,
) -> AppResult<InitResponse> {
    let request = InitRequest::from_json(body)?;
    let folder_id = config.require_folder_id()?;
    let intent = request.into_intent(config.require_max_file_size()?)?;

    let access_token = tokens.access_token(DRIVE_FILE_SCOPE).await?;

    let drive = DriveClient::new(transport, &config.upload_endpoint);
    let upload_url = drive
        .create_resumable_session(&access_token, folder_id, &intent)
        .await?;

    logger.info(
        "Resumable session created",
        log_data!(
            "name" => intent.name,
            "mime_type" => intent.mime_type,
            "size" => intent.size,
            "session" => fingerprint(&upload_url)
        ),
    );

    Ok(InitResponse::new(upload_url))
}
