// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: registration, login and the caller's own profile.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::Auth,
    domain::UserProfile,
    error::ApiError,
    models::{ApiJson, ApiResponse, Created},
    services::accounts::{
        self, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest,
        UpdateProfileRequest,
    },
    state::AppState,
    validation::Valid,
};

/// Register a new account.
///
/// Creates the user with the `member` role and, when `member` is supplied,
/// the membership profile in the same request.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Validation failed or account already exists"),
        (status = 403, description = "Registration is disabled")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Valid(req): Valid<RegisterRequest>,
) -> Result<Created<AuthResponse>, ApiError> {
    let auth = accounts::register(&state, req, Utc::now()).await?;
    Ok(ApiResponse::created(auth))
}

/// Log in with username or email.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled or locked")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Valid(req): Valid<LoginRequest>,
) -> Result<ApiJson<AuthResponse>, ApiError> {
    let auth = accounts::login(&state, req, Utc::now()).await?;
    Ok(ApiResponse::ok(auth))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(State(state): State<AppState>, Auth(user): Auth) -> Result<ApiJson<UserProfile>, ApiError> {
    Ok(ApiResponse::ok(accounts::me(&state, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<UpdateProfileRequest>,
) -> Result<ApiJson<UserProfile>, ApiError> {
    let profile = accounts::update_profile(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::ok(profile))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is wrong or new password is invalid"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<ChangePasswordRequest>,
) -> Result<ApiJson<()>, ApiError> {
    accounts::change_password(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::message("Password changed"))
}
