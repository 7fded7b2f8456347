/// Error types for Listing Service
///
/// Per-image failures (`ImageError`) are collected into the batch outcome and
/// never abort sibling images. Request failures (`AppError`) are converted to
/// HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

use crate::models::ProcessingError;

/// Result type for listing-service request handling
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure while classifying or uploading a single image
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// A required credential is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external API answered with a non-success status
    #[error("Upstream error ({status}): {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The external API could not be reached or the transfer failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The model reply was not the expected JSON object
    #[error("Failed to parse model response: {message}. Raw response: {snippet}")]
    Parse { message: String, snippet: String },
}

/// Request-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad request shape; nothing was processed
    #[error("{0}")]
    Validation(String),

    /// Every image failed, so there is no CSV to return
    #[error("Failed to process any images")]
    AllImagesFailed(Vec<ProcessingError>),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [ProcessingError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AllImagesFailed(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorBody {
            error: self.to_string(),
            details: match self {
                AppError::AllImagesFailed(errors) => Some(errors.as_slice()),
                _ => None,
            },
            code: match self {
                AppError::Internal(_) => Some("INTERNAL_ERROR"),
                _ => None,
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(format!("Failed to encode CSV: {err}"))
    }
}
