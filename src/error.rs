use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::{AuthError, ForbiddenReason};
use crate::report::builder::ReportError;
use crate::report::validation::{ValidationErrorBody, ValidationErrors};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new("Forbidden", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

/// Every way a report request can fail, mapped onto an HTTP response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("input validation error ({} problems)", .0.len())]
    Validation(ValidationErrors),
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error("server misconfiguration: API key not configured")]
    Misconfigured,
    #[error("report generation failed: {0}")]
    ReportGenerationFailed(#[from] ReportError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(reason) => ApiError::Forbidden(reason),
            AuthError::Misconfigured => ApiError::Misconfigured,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Misconfigured
            | ApiError::ReportGenerationFailed(_)
            | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            ApiError::Validation(errors) => builder.json(ValidationErrorBody::from(errors)),
            ApiError::Forbidden(reason) => {
                builder.json(ErrorResponse::forbidden(&format!("Forbidden: {}", reason)))
            }
            ApiError::Misconfigured => builder.json(ErrorResponse::internal_error(
                "Server misconfiguration: API key not configured",
            )),
            // Causes stay in the logs; callers get a fixed message.
            ApiError::ReportGenerationFailed(_) => {
                builder.json(ErrorResponse::internal_error("Failed to create PDF"))
            }
            ApiError::Unexpected(_) => {
                builder.json(ErrorResponse::internal_error("Unexpected server error"))
            }
        }
    }
}
