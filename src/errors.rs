use serde::Serialize;
use thiserror::Error;
use worker::Error as WorkerError;

use crate::responses::{self, HttpResponse};

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Missing {0}")]
    MissingConfig(&'static str),
    #[error("Invalid {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: String,
    },
    #[error("{0}")]
    BadGateway(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Not found")]
    NotFound,
}

/// JSON body returned for every locally produced failure.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Forbidden(_) => 403,
            AppError::NotFound => 404,
            AppError::MethodNotAllowed => 405,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Upstream { status, .. } => *status,
            AppError::BadGateway(_) => 502,
            AppError::Worker(_)
            | AppError::Internal(_)
            | AppError::MissingConfig(_)
            | AppError::InvalidConfig { .. }
            | AppError::Credential(_) => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let details = match self {
            AppError::Upstream { details, .. } => Some(details.clone()),
            _ => None,
        };
        ErrorBody {
            ok: false,
            error: self.to_string(),
            details,
        }
    }

    pub fn to_response(&self) -> HttpResponse {
        let status = self.status_code();
        responses::json(status, &self.to_body()).unwrap_or_else(|_| responses::empty(status))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(error.to_string())
    }
}
