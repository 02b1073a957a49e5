// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy and the single stage that maps it onto HTTP responses.
//!
//! Domain services return [`ServiceError`]; handlers return [`ApiError`],
//! which renders the `{success: false, message, errors?}` envelope.

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{auth::AuthError, storage::StorageError, validation::FieldError};

/// Message returned in place of internal error details in production.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Suppress internal error messages in responses. Call once at startup.
pub fn set_production_mode(enabled: bool) {
    let _ = PRODUCTION_MODE.set(enabled);
}

fn production_mode() -> bool {
    PRODUCTION_MODE.get().copied().unwrap_or(false)
}

/// Errors raised by domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Payload shape or constraint violations, reported all at once.
    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// A business-rule guard rejected the transition.
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidOperation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ServiceError::ValidationFailed(vec![FieldError::new(field, message)])
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(entity) => ServiceError::NotFound(format!("{entity} not found")),
            StorageError::AlreadyExists(entity) => {
                ServiceError::InvalidOperation(format!("{entity} already exists"))
            }
            other => ServiceError::Unexpected(other.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e.status_code() {
            StatusCode::UNAUTHORIZED => ServiceError::Unauthenticated(e.to_string()),
            StatusCode::FORBIDDEN => ServiceError::Forbidden(e.to_string()),
            _ => ServiceError::Unexpected(e.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Vec<FieldError>,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Validation failed".to_string(),
            errors,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::ValidationFailed(errors) => ApiError::validation(errors),
            ServiceError::Unauthenticated(msg) => ApiError::unauthorized(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::InvalidOperation(msg) => ApiError::bad_request(msg),
            ServiceError::Unexpected(msg) => ApiError::internal(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ServiceError::from(e).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::new(e.status_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut message = self.message;
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %message, "Request failed");
            if production_mode() {
                message = INTERNAL_ERROR_MESSAGE.to_string();
            }
        }

        let body = Json(ErrorBody {
            success: false,
            message,
            errors: self.errors,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::field("email", "bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden("x"), StatusCode::FORBIDDEN),
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::invalid("Event is full"), StatusCode::BAD_REQUEST),
            (ServiceError::Unexpected("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn storage_not_found_becomes_not_found() {
        let err = ServiceError::from(StorageError::NotFound("Event abc".into()));
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "Event abc not found"));
    }

    #[tokio::test]
    async fn validation_error_renders_field_list() {
        let response = ApiError::validation(vec![
            FieldError::new("password", "password must be at least 6 characters"),
            FieldError::new("email", "email must be a valid email address"),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[tokio::test]
    async fn business_rule_error_has_no_errors_array() {
        let response = ApiError::from(ServiceError::invalid("Event is full")).into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"success":false,"message":"Event is full"}"#);
    }
}
