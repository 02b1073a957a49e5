// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Membership profiles.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{AdminOnly, Auth, Authorized},
    domain::Member,
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::members::{
        self, MemberDetail, MemberListQuery, MemberProfileRequest, MemberStatusRequest,
        UpdateMemberRequest, VolunteerHoursRequest,
    },
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery},
};

/// Create the caller's membership profile.
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Members",
    security(("bearer_auth" = [])),
    request_body = MemberProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ApiResponse<Member>),
        (status = 400, description = "Validation failed or profile already exists"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<MemberProfileRequest>,
) -> Result<Created<Member>, ApiError> {
    let member = members::create_profile(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::created(member))
}

/// The caller's profile with attended events and sessions.
#[utoipa::path(
    get,
    path = "/api/members/me",
    tag = "Members",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Membership profile", body = ApiResponse<MemberDetail>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No membership profile")
    )
)]
pub async fn my_profile(State(state): State<AppState>, Auth(user): Auth) -> Result<ApiJson<MemberDetail>, ApiError> {
    Ok(ApiResponse::ok(members::my_profile(&state, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/members/me",
    tag = "Members",
    security(("bearer_auth" = [])),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<Member>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No membership profile")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<UpdateMemberRequest>,
) -> Result<ApiJson<Member>, ApiError> {
    let member = members::update_profile(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::ok(member))
}

#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Members",
    params(MemberListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Members", body = ApiResponse<Paginated<Member>>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidQuery(query): ValidQuery<MemberListQuery>,
) -> Result<ApiJson<Paginated<Member>>, ApiError> {
    Ok(ApiResponse::ok(members::list(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Member id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Member", body = ApiResponse<MemberDetail>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<MemberDetail>, ApiError> {
    Ok(ApiResponse::ok(members::get(&state, &path.id).await?))
}

#[utoipa::path(
    put,
    path = "/api/members/{id}/status",
    tag = "Members",
    params(("id" = String, Path, description = "Member id")),
    security(("bearer_auth" = [])),
    request_body = MemberStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Member>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<MemberStatusRequest>,
) -> Result<ApiJson<Member>, ApiError> {
    let member = members::set_status(&state, &admin, &path.id, req.status, Utc::now()).await?;
    Ok(ApiResponse::ok(member))
}

#[utoipa::path(
    post,
    path = "/api/members/{id}/volunteer-hours",
    tag = "Members",
    params(("id" = String, Path, description = "Member id")),
    security(("bearer_auth" = [])),
    request_body = VolunteerHoursRequest,
    responses(
        (status = 200, description = "Hours added", body = ApiResponse<Member>),
        (status = 400, description = "Invalid hours"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn add_volunteer_hours(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<VolunteerHoursRequest>,
) -> Result<ApiJson<Member>, ApiError> {
    let member = members::add_volunteer_hours(&state, &admin, &path.id, req.hours, Utc::now()).await?;
    Ok(ApiResponse::ok(member))
}
