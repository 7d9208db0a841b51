//! Error taxonomy for the HTTP surface.
//!
//! Every failure a handler or the auth gate can produce ends up as an
//! [`ApiError`], which renders as
//! `{"error": {"code": ..., "message": ..., "details": {...}}}`.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// User-correctable input problem.
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
        /// 422 when the body or query could not be parsed at all.
        unprocessable: bool,
    },

    #[error("Authorization header is required")]
    MissingAuthorization,

    #[error("Authorization header must be in format: Bearer <token>")]
    InvalidAuthorizationFormat,

    #[error("Invalid or expired API key")]
    InvalidCredential,

    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Message with ID '{0}' does not exist")]
    NotFound(String),

    /// The message store failed. The source is logged, never returned.
    #[error("The message store is currently unavailable")]
    UpstreamUnavailable(#[source] StoreError),

    /// A handler panicked; nothing about the panic reaches the client.
    #[error("An unexpected error occurred")]
    Internal,
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
            unprocessable: false,
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
            unprocessable: true,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::MissingAuthorization => "MISSING_AUTHORIZATION",
            Self::InvalidAuthorizationFormat => "INVALID_AUTHORIZATION_FORMAT",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation {
                unprocessable: true,
                ..
            } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::MissingAuthorization
            | Self::InvalidAuthorizationFormat
            | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Validation {
                field: Some(field), ..
            } => json!({ "field": field }),
            Self::RateLimitExceeded { retry_after_secs } => {
                json!({ "retry_after_seconds": retry_after_secs })
            }
            Self::NotFound(id) => json!({ "message_id": id }),
            _ => json!({}),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCursor => Self::validation("start_key", err.to_string()),
            other => Self::UpstreamUnavailable(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": self.details(),
            }
        });
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimitExceeded { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
