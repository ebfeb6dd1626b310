//! Centralized API error handling for TripVault
//!
//! This module provides a unified error type for the wallet, check-in and
//! withdrawal domains with proper HTTP status code mapping and JSON error
//! responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code expired: {0}")]
    OtpExpired(String),

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Amount does not match the amount the code was issued for")]
    AmountMismatch,

    #[error("Guest already checked in")]
    AlreadyCheckedIn,

    #[error("Guest already checked out")]
    AlreadyCheckedOut,

    #[error("Payment not completed: {0}")]
    PaymentNotCompleted(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Get the stable error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidCode => "INVALID_CODE",
            ApiError::OtpExpired(_) => "OTP_EXPIRED",
            ApiError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            ApiError::AmountMismatch => "AMOUNT_MISMATCH",
            ApiError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            ApiError::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            ApiError::PaymentNotCompleted(_) => "PAYMENT_NOT_COMPLETED",
            ApiError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::ProviderError(_) => "PROVIDER_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidCode => StatusCode::BAD_REQUEST,
            ApiError::OtpExpired(_) => StatusCode::GONE,
            ApiError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            ApiError::AmountMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::AlreadyCheckedIn => StatusCode::CONFLICT,
            ApiError::AlreadyCheckedOut => StatusCode::CONFLICT,
            ApiError::PaymentNotCompleted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) | ApiError::ProviderError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::ProviderError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ValidationError(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::InvalidCode.error_code(), "INVALID_CODE");
        assert_eq!(ApiError::TooManyAttempts.error_code(), "TOO_MANY_ATTEMPTS");
        assert_eq!(ApiError::AmountMismatch.error_code(), "AMOUNT_MISMATCH");
        assert_eq!(ApiError::AlreadyCheckedIn.error_code(), "ALREADY_CHECKED_IN");
        assert_eq!(
            ApiError::InsufficientFunds("balance".to_string()).error_code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            ApiError::PaymentNotCompleted("test".to_string()).error_code(),
            "PAYMENT_NOT_COMPLETED"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::AlreadyCheckedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::TooManyAttempts.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::InsufficientFunds("balance".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Unauthorized("not a party".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::ProviderError("gateway down".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
