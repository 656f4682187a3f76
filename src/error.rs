//! Unified error handling
//!
//! `PipelineError` is the failure taxonomy of the analysis and drafting
//! pipeline. `ApiError` turns failures into consistent JSON responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// A single violated schema constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A captured file that could not be turned back into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDecodeFailure {
    pub name: String,
    pub reason: String,
}

/// Stable, serializable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    SecurityViolation,
    ValidationError,
    RateLimitExceeded,
    FileDecodeError,
    RemoteServiceError,
    PersistenceError,
    DraftGenerationError,
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("{0}")]
    SecurityViolation(String),

    #[error("Invalid request: {}", describe_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Too many requests. Please try again in {retry_after_minutes} minutes.")]
    RateLimitExceeded { retry_after_minutes: u64 },

    #[error("Could not read uploaded files: {}", describe_decode_failures(.0))]
    FileDecode(Vec<FileDecodeFailure>),

    #[error("Analysis service error: {0}")]
    RemoteService(String),

    #[error("Failed to save analysis: {0}")]
    Persistence(String),

    #[error("Draft generation failed: {0}")]
    DraftGeneration(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SecurityViolation(_) => ErrorKind::SecurityViolation,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::FileDecode(_) => ErrorKind::FileDecodeError,
            Self::RemoteService(_) => ErrorKind::RemoteServiceError,
            Self::Persistence(_) => ErrorKind::PersistenceError,
            Self::DraftGeneration(_) => ErrorKind::DraftGenerationError,
        }
    }

    /// Whether the error stops the request before any network call is made.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Self::SecurityViolation(_)
                | Self::Validation(_)
                | Self::RateLimitExceeded { .. }
                | Self::FileDecode(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SecurityViolation(_) | Self::FileDecode(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::RemoteService(_) | Self::DraftGeneration(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn describe_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_decode_failures(failures: &[FileDecodeFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.name, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// JSON error body. `request_id` is filled in by
/// [`stamp_error_request_id`](crate::middleware::stamp_error_request_id).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Render with `status`, keeping a copy in the response extensions.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (status, Json(self.clone())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(e) => e.status_code(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Pipeline(e) => match e.kind() {
                ErrorKind::SecurityViolation => "SECURITY_VIOLATION",
                ErrorKind::ValidationError => "VALIDATION_ERROR",
                ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
                ErrorKind::FileDecodeError => "FILE_DECODE_ERROR",
                ErrorKind::RemoteServiceError => "REMOTE_SERVICE_ERROR",
                ErrorKind::PersistenceError => "PERSISTENCE_ERROR",
                ErrorKind::DraftGenerationError => "DRAFT_GENERATION_ERROR",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            // Storage details stay in the logs
            Self::Pipeline(PipelineError::Persistence(_)) | Self::Internal(_) => {
                "An internal error occurred".to_string()
            }
            Self::Pipeline(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Pipeline(e @ PipelineError::Persistence(_)) => {
                tracing::error!(error = %e, "Storage error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        ErrorResponse::new(self.error_code(), self.public_message())
            .into_response_with(self.status_code())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
