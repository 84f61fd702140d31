//! Service error types.
//!
//! Every authentication failure maps to 401 with a `WWW-Authenticate`
//! challenge. Messages returned to clients are short; details are logged.

use crate::bearer::BearerError;
use crate::verifier::VerifyError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Challenge sent with every 401 response.
pub const WWW_AUTHENTICATE_CHALLENGE: &str = "Bearer realm=\"jwtauth\", error=\"invalid_token\"";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ServiceError {
    /// The HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthenticated(_) => 401,
            ServiceError::ServiceUnavailable(_) => 503,
            ServiceError::Internal => 500,
        }
    }
}

impl From<BearerError> for ServiceError {
    fn from(err: BearerError) -> Self {
        ServiceError::Unauthenticated(err.to_string())
    }
}

impl From<VerifyError> for ServiceError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Rejected(reason) => ServiceError::Unauthenticated(reason.to_string()),
            VerifyError::Internal(detail) => {
                tracing::error!(target: "jwtauth.service.errors", error = %detail, "Verifier failed");
                ServiceError::Unauthenticated("Unknown auth error".to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ServiceError::Unauthenticated(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", reason)
            }
            ServiceError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "jwtauth.service.errors", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            ServiceError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static(WWW_AUTHENTICATE_CHALLENGE),
            );
        }

        response
    }
}
