use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::{AppError, AppResult};
use crate::middleware::ValidationMiddleware;

const MISSING_INTENT_FIELDS: &str = "Missing name, mimeType, or size";

/// Init request body with its fields present. The size is kept as written
/// until the configured limit is known.
#[derive(Clone, Debug, PartialEq)]
pub struct InitRequest {
    pub name: String,
    pub mime_type: String,
    pub size: Number,
}

impl InitRequest {
    /// Parses an init request body and checks that every field is present.
    pub fn from_json(body: &[u8]) -> AppResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> AppResult<Self> {
        let text_field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let size = match value.get("size") {
            Some(Value::Number(size)) => Some(size.clone()),
            _ => None,
        };

        let (Some(name), Some(mime_type), Some(size)) =
            (text_field("name"), text_field("mimeType"), size)
        else {
            return Err(AppError::BadRequest(MISSING_INTENT_FIELDS.to_string()));
        };

        Ok(Self {
            name,
            mime_type,
            size,
        })
    }

    /// Applies the size limit and yields the validated intent.
    pub fn into_intent(self, max_file_size: u64) -> AppResult<UploadIntent> {
        let size = ValidationMiddleware::validate_declared_size(&self.size, max_file_size)?;
        Ok(UploadIntent {
            name: self.name,
            mime_type: self.mime_type,
            size,
        })
    }
}

/// File the browser intends to upload, as declared to the init endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadIntent {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Metadata body sent when creating a resumable session.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileMetadata<'a> {
    pub name: &'a str,
    pub parents: [&'a str; 1],
    pub mime_type: &'a str,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub ok: bool,
    pub upload_url: String,
}

impl InitResponse {
    pub fn new(upload_url: String) -> Self {
        Self {
            ok: true,
            upload_url,
        }
    }
}

/// Addressing for one chunk forwarded by the relay endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkDescriptor {
    pub upload_url: String,
    pub start: u64,
    pub end_exclusive: u64,
    pub total: u64,
}

impl ChunkDescriptor {
    /// `Content-Range` value with an inclusive end offset.
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.start,
            self.end_exclusive - 1,
            self.total
        )
    }
}

/// Provider reply to a chunk PUT, relayed to the caller unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayOutcome {
    pub status: u16,
    pub range: Option<String>,
    pub body: String,
}

/// Token endpoint reply for the JWT bearer grant.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
}
