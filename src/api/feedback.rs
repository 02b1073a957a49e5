// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! General feedback. Anyone may submit; admins triage and respond.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{AdminOnly, Authorized, OptionalAuth},
    domain::Feedback,
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::feedback::{self, FeedbackListQuery, RespondFeedbackRequest, SubmitFeedbackRequest},
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery},
};

/// Submit feedback. Attributed to the caller when a token is sent.
#[utoipa::path(
    post,
    path = "/api/feedback",
    tag = "Feedback",
    request_body = SubmitFeedbackRequest,
    responses(
        (status = 201, description = "Feedback received", body = ApiResponse<Feedback>),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn submit(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Valid(req): Valid<SubmitFeedbackRequest>,
) -> Result<Created<Feedback>, ApiError> {
    let item = feedback::submit(&state, user.as_ref(), req, Utc::now()).await?;
    Ok(ApiResponse::created(item))
}

#[utoipa::path(
    get,
    path = "/api/feedback",
    tag = "Feedback",
    params(FeedbackListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Feedback", body = ApiResponse<Paginated<Feedback>>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidQuery(query): ValidQuery<FeedbackListQuery>,
) -> Result<ApiJson<Paginated<Feedback>>, ApiError> {
    Ok(ApiResponse::ok(feedback::list(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/feedback/{id}",
    tag = "Feedback",
    params(("id" = String, Path, description = "Feedback id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Feedback", body = ApiResponse<Feedback>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Feedback not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<Feedback>, ApiError> {
    Ok(ApiResponse::ok(feedback::get(&state, &path.id).await?))
}

#[utoipa::path(
    put,
    path = "/api/feedback/{id}/respond",
    tag = "Feedback",
    params(("id" = String, Path, description = "Feedback id")),
    security(("bearer_auth" = [])),
    request_body = RespondFeedbackRequest,
    responses(
        (status = 200, description = "Response recorded", body = ApiResponse<Feedback>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Feedback not found")
    )
)]
pub async fn respond(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<RespondFeedbackRequest>,
) -> Result<ApiJson<Feedback>, ApiError> {
    let item = feedback::respond(&state, &admin, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}
