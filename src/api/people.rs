// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Advisor and peer-educator directories.
//!
//! Listing is public and shows active advisors and certified peer educators.
//! Admins may pass `all=true` to include everyone.

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{AdminOnly, Authorized, OptionalAuth},
    domain::{Advisor, PeerEducator},
    error::ApiError,
    models::{ApiJson, ApiResponse, Created},
    services::people::{
        self, CreateAdvisorRequest, CreatePeerEducatorRequest, UpdateAdvisorRequest,
        UpdatePeerEducatorRequest, WithUser,
    },
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery, Validate, Validator},
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DirectoryQuery {
    /// Include inactive or uncertified entries (admin only).
    #[serde(default)]
    pub all: bool,
}

impl Validate for DirectoryQuery {
    fn validate(&self, _v: &mut Validator) {}
}

fn wants_all(query: &DirectoryQuery, viewer: &OptionalAuth) -> Result<bool, ApiError> {
    if !query.all {
        return Ok(false);
    }
    match &viewer.0 {
        Some(user) if user.is_admin() => Ok(true),
        Some(_) => Err(ApiError::forbidden("Admin role required to list all entries")),
        None => Err(ApiError::unauthorized("Authorization header is required")),
    }
}

// =============================================================================
// Advisors
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/advisors",
    tag = "People",
    params(DirectoryQuery),
    responses(
        (status = 200, description = "Advisors", body = ApiResponse<Vec<WithUser<Advisor>>>)
    )
)]
pub async fn list_advisors(
    State(state): State<AppState>,
    viewer: OptionalAuth,
    ValidQuery(query): ValidQuery<DirectoryQuery>,
) -> Result<ApiJson<Vec<WithUser<Advisor>>>, ApiError> {
    let all = wants_all(&query, &viewer)?;
    Ok(ApiResponse::ok(people::list_advisors(&state, all).await?))
}

#[utoipa::path(
    get,
    path = "/api/advisors/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Advisor id")),
    responses(
        (status = 200, description = "Advisor", body = ApiResponse<WithUser<Advisor>>),
        (status = 404, description = "Advisor not found")
    )
)]
pub async fn get_advisor(
    State(state): State<AppState>,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<WithUser<Advisor>>, ApiError> {
    Ok(ApiResponse::ok(people::get_advisor(&state, &path.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/advisors",
    tag = "People",
    security(("bearer_auth" = [])),
    request_body = CreateAdvisorRequest,
    responses(
        (status = 201, description = "Advisor created", body = ApiResponse<Advisor>),
        (status = 400, description = "Validation failed or profile already exists"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_advisor(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<CreateAdvisorRequest>,
) -> Result<Created<Advisor>, ApiError> {
    let advisor = people::create_advisor(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::created(advisor))
}

#[utoipa::path(
    put,
    path = "/api/advisors/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Advisor id")),
    security(("bearer_auth" = [])),
    request_body = UpdateAdvisorRequest,
    responses(
        (status = 200, description = "Advisor updated", body = ApiResponse<Advisor>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Advisor not found")
    )
)]
pub async fn update_advisor(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateAdvisorRequest>,
) -> Result<ApiJson<Advisor>, ApiError> {
    let advisor = people::update_advisor(&state, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(advisor))
}

#[utoipa::path(
    delete,
    path = "/api/advisors/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Advisor id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Advisor removed"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Advisor not found")
    )
)]
pub async fn delete_advisor(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    people::delete_advisor(&state, &admin, &path.id, Utc::now()).await?;
    Ok(ApiResponse::message("Advisor removed"))
}

// =============================================================================
// Peer educators
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/peer-educators",
    tag = "People",
    params(DirectoryQuery),
    responses(
        (status = 200, description = "Peer educators", body = ApiResponse<Vec<WithUser<PeerEducator>>>)
    )
)]
pub async fn list_peer_educators(
    State(state): State<AppState>,
    viewer: OptionalAuth,
    ValidQuery(query): ValidQuery<DirectoryQuery>,
) -> Result<ApiJson<Vec<WithUser<PeerEducator>>>, ApiError> {
    let all = wants_all(&query, &viewer)?;
    Ok(ApiResponse::ok(people::list_peer_educators(&state, all).await?))
}

#[utoipa::path(
    get,
    path = "/api/peer-educators/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Peer educator id")),
    responses(
        (status = 200, description = "Peer educator", body = ApiResponse<WithUser<PeerEducator>>),
        (status = 404, description = "Peer educator not found")
    )
)]
pub async fn get_peer_educator(
    State(state): State<AppState>,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<WithUser<PeerEducator>>, ApiError> {
    Ok(ApiResponse::ok(people::get_peer_educator(&state, &path.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/peer-educators",
    tag = "People",
    security(("bearer_auth" = [])),
    request_body = CreatePeerEducatorRequest,
    responses(
        (status = 201, description = "Peer educator created", body = ApiResponse<PeerEducator>),
        (status = 400, description = "Validation failed or profile already exists"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_peer_educator(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<CreatePeerEducatorRequest>,
) -> Result<Created<PeerEducator>, ApiError> {
    let educator = people::create_peer_educator(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::created(educator))
}

#[utoipa::path(
    put,
    path = "/api/peer-educators/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Peer educator id")),
    security(("bearer_auth" = [])),
    request_body = UpdatePeerEducatorRequest,
    responses(
        (status = 200, description = "Peer educator updated", body = ApiResponse<PeerEducator>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Peer educator not found")
    )
)]
pub async fn update_peer_educator(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdatePeerEducatorRequest>,
) -> Result<ApiJson<PeerEducator>, ApiError> {
    let educator = people::update_peer_educator(&state, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(educator))
}

#[utoipa::path(
    delete,
    path = "/api/peer-educators/{id}",
    tag = "People",
    params(("id" = String, Path, description = "Peer educator id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Peer educator removed"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Peer educator not found")
    )
)]
pub async fn delete_peer_educator(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    people::delete_peer_educator(&state, &admin, &path.id, Utc::now()).await?;
    Ok(ApiResponse::message("Peer educator removed"))
}
