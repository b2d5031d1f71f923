//! Error responses.
//!
//! Every failure leaves the API in the same envelope as a success:
//! `{success: false, message, data: null, statusCode}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crewdesk_auth::{AuthError, TokenValidationError};
use crewdesk_core::DomainError;
use crewdesk_infra::RepositoryError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique value. Reported as 400, like validation failures.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure; the detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(detail: impl ToString) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg) => msg,
        };
        json_error(status, message)
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
            "data": null,
            "statusCode": status.as_u16(),
        })),
    )
        .into_response()
}

/// Client-facing message for a duplicate value in `field`.
pub fn conflict_message(field: &str) -> String {
    match field {
        "cus_email" | "emp_email" => "email already exists".to_string(),
        "cus_phone_number" => "phone number already exists".to_string(),
        "emp_mobile_number" => "mobile number already exists".to_string(),
        "job_sku" => "job SKU already exists".to_string(),
        "emp_id" => "employee is already assigned a job".to_string(),
        other => format!("{other} already exists"),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound("Not found".to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { field, .. } => Self::Conflict(conflict_message(&field)),
            RepositoryError::InvalidIdentifier(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::Token(err) => err.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TokenValidationError> for ApiError {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => Self::unauthorized("Token has expired"),
            _ => Self::unauthorized("Invalid token"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_name_the_duplicated_value() {
        let err: ApiError = RepositoryError::Conflict {
            collection: "customer".into(),
            field: "cus_email".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "email already exists");

        assert_eq!(conflict_message("job_sku"), "job SKU already exists");
        assert_eq!(conflict_message("nickname"), "nickname already exists");
    }

    #[test]
    fn store_failures_become_opaque_500s() {
        let err: ApiError = RepositoryError::Serialization("bad".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_failures_are_unauthorized() {
        let err: ApiError = TokenValidationError::Expired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Token has expired");

        let err: ApiError = AuthError::Token(TokenValidationError::InvalidSignature).into();
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn domain_validation_is_a_400() {
        let err: ApiError = DomainError::validation("cus_email is required").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "cus_email is required");
    }
}
