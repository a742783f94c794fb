use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::analysis::response::{InvalidResultError, ResponseParseError};
use crate::extract::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to extract resume text: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Gemini API error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to parse Gemini response")]
    ResponseParse { raw: String },

    #[error("Gemini response did not match the expected shape: {reason}")]
    InvalidResult { reason: String, raw: String },

    #[error("Request body exceeds the configured upload limit")]
    PayloadTooLarge,

    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Api { status, body } => AppError::Upstream {
                status: Some(status),
                message: format!("{status} {body}"),
            },
            LlmError::Http(e) => AppError::Upstream {
                status: e.status().map(|s| s.as_u16()),
                message: e.without_url().to_string(),
            },
            LlmError::Decode(e) => AppError::Upstream {
                status: None,
                message: format!("malformed response body: {e}"),
            },
        }
    }
}

impl From<ResponseParseError> for AppError {
    fn from(err: ResponseParseError) -> Self {
        AppError::ResponseParse { raw: err.raw }
    }
}

impl From<InvalidResultError> for AppError {
    fn from(err: InvalidResultError) -> Self {
        AppError::InvalidResult {
            reason: err.reason,
            raw: err.raw,
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Extraction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXTRACTION_ERROR"),
            AppError::Upstream { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR"),
            AppError::ResponseParse { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RESPONSE_PARSE_ERROR")
            }
            AppError::InvalidResult { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_RESULT_ERROR")
            }
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::UnsupportedMediaType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
            ),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let mut body = Map::new();
        body.insert("code".to_string(), json!(code));

        match &self {
            AppError::Extraction(e) => {
                tracing::error!("Extraction error: {e}");
            }
            AppError::Upstream {
                status: upstream_status,
                message,
            } => {
                tracing::error!("Upstream error: {message}");
                if let Some(s) = upstream_status {
                    body.insert("upstreamStatus".to_string(), json!(s));
                }
            }
            AppError::ResponseParse { raw } => {
                tracing::warn!("Failed to parse Gemini response as JSON. Raw response: {raw}");
                body.insert("geminiRaw".to_string(), json!(raw));
            }
            AppError::InvalidResult { reason, raw } => {
                tracing::warn!("Gemini response failed validation ({reason}). Raw response: {raw}");
                body.insert("geminiRaw".to_string(), json!(raw));
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
            }
            _ => {}
        }

        let message = match &self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };
        body.insert("error".to_string(), json!(message));

        (status, Json(Value::Object(body))).into_response()
    }
}
