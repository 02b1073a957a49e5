// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request payload validation.
//!
//! Payload types implement [`Validate`] by feeding their fields through a
//! [`Validator`], which collects every violation instead of stopping at the
//! first. The [`Valid`], [`ValidQuery`] and [`ValidPath`] extractors run the
//! check for bodies, query strings and path parameters respectively, so a
//! handler only ever sees payloads that passed.
//!
//! Unknown fields are dropped during deserialization.

use std::fmt::Display;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ServiceError, ServiceResult};

/// Minimum password length accepted at registration and password change.
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Collects constraint violations for one payload.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Non-blank string. Returns whether the check passed.
    pub fn required(&mut self, field: &str, value: &str) -> bool {
        let ok = !value.trim().is_empty();
        self.check(ok, field, format!("{field} is required"));
        ok
    }

    /// Character length within `[min, max]`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            self.push(field, format!("{field} must be at least {min} characters"));
        } else if len > max {
            self.push(field, format!("{field} must be at most {max} characters"));
        }
    }

    pub fn optional_length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(value) = value {
            self.length(field, value, min, max);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.check(
            is_valid_email(value),
            field,
            format!("{field} must be a valid email address"),
        );
    }

    pub fn range<T: PartialOrd + Display + Copy>(&mut self, field: &str, value: T, min: T, max: T) {
        if value < min || value > max {
            self.push(field, format!("{field} must be between {min} and {max}"));
        }
    }

    pub fn optional_range<T: PartialOrd + Display + Copy>(
        &mut self,
        field: &str,
        value: Option<T>,
        min: T,
        max: T,
    ) {
        if let Some(value) = value {
            self.range(field, value, min, max);
        }
    }

    /// Absolute http(s) URL, or a path into the local upload area.
    pub fn url(&mut self, field: &str, value: &str) {
        self.check(is_valid_link(value), field, format!("{field} must be a valid URL"));
    }

    pub fn optional_url(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.url(field, value);
        }
    }

    pub fn uuid(&mut self, field: &str, value: &str) {
        self.check(
            uuid::Uuid::parse_str(value).is_ok(),
            field,
            format!("{field} must be a valid identifier"),
        );
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn finish(self) -> ServiceResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(self.errors))
        }
    }
}

/// Declarative payload constraints.
pub trait Validate {
    fn validate(&self, v: &mut Validator);

    fn validated(self) -> ServiceResult<Self>
    where
        Self: Sized,
    {
        let mut v = Validator::new();
        self.validate(&mut v);
        v.finish()?;
        Ok(self)
    }
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn is_valid_link(value: &str) -> bool {
    if value.starts_with("/uploads/") {
        return true;
    }
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

/// Letters, digits and underscores only.
pub fn is_valid_username(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// JSON body extractor that rejects payloads failing [`Validate`].
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![FieldError::new("body", rejection.body_text())])
            })?;
        value.validated().map(Valid).map_err(ApiError::from)
    }
}

/// Query-string extractor that rejects payloads failing [`Validate`].
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![FieldError::new("query", rejection.body_text())])
            })?;
        value.validated().map(ValidQuery).map_err(ApiError::from)
    }
}

/// Path-parameter extractor that rejects payloads failing [`Validate`].
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![FieldError::new("path", rejection.body_text())])
            })?;
        value.validated().map(ValidPath).map_err(ApiError::from)
    }
}

/// `/{id}` path parameter.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct IdPath {
    pub id: String,
}

impl Validate for IdPath {
    fn validate(&self, v: &mut Validator) {
        v.uuid("id", &self.id);
    }
}

/// `/{id}/.../{user_id}` path parameters.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemberOfPath {
    pub id: String,
    pub user_id: String,
}

impl Validate for MemberOfPath {
    fn validate(&self, v: &mut Validator) {
        v.uuid("id", &self.id);
        v.uuid("user_id", &self.user_id);
    }
}

/// `/{id}/comments/{comment_id}` path parameters.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CommentPath {
    pub id: String,
    pub comment_id: String,
}

impl Validate for CommentPath {
    fn validate(&self, v: &mut Validator) {
        v.uuid("id", &self.id);
        v.uuid("comment_id", &self.comment_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Debug, serde::Deserialize)]
    struct Signup {
        email: String,
        password: String,
    }

    impl Validate for Signup {
        fn validate(&self, v: &mut Validator) {
            v.email("email", &self.email);
            v.length("password", &self.password, PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH);
        }
    }

    #[test]
    fn collects_every_violation() {
        let signup = Signup {
            email: "not-an-email".into(),
            password: "abc".into(),
        };
        let err = signup.validated().unwrap_err();
        match err {
            ServiceError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[1].field, "password");
                assert_eq!(errors[1].message, "password must be at least 6 characters");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn email_rules() {
        assert!(is_valid_email("jane@uni.edu"));
        assert!(!is_valid_email("jane@uni"));
        assert!(!is_valid_email("jane uni@x.org"));
        assert!(!is_valid_email("@uni.edu"));
        assert!(!is_valid_email("a@b@c.org"));
    }

    #[test]
    fn link_rules() {
        assert!(is_valid_link("https://example.org/a.pdf"));
        assert!(is_valid_link("/uploads/abc.png"));
        assert!(!is_valid_link("ftp://example.org/file"));
        assert!(!is_valid_link("not a url"));
    }

    #[test]
    fn range_and_required() {
        let mut v = Validator::new();
        v.range("rating", 6u8, 1, 5);
        assert!(!v.required("title", "   "));
        let errors = v.into_errors();
        assert_eq!(errors[0].message, "rating must be between 1 and 5");
        assert_eq!(errors[1].message, "title is required");
    }

    #[tokio::test]
    async fn valid_extractor_rejects_bad_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"email":"x@y.org","password":"abc","extra":1}"#))
            .unwrap();

        let result = Valid::<Signup>::from_request(req, &()).await;
        let err = result.err().expect("validation should fail");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "password");
    }

    #[tokio::test]
    async fn valid_extractor_reports_malformed_json() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let err = Valid::<Signup>::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.errors[0].field, "body");
    }
}
