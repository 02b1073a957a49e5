// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-education session endpoints.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{Auth, Authorized, FacilitatorOnly, OptionalAuth},
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::{
        events::AttendanceRequest,
        sessions::{
            self, CreateSessionRequest, ScoresRequest, SessionListQuery, SessionStatusRequest,
            SessionView, UpdateSessionRequest,
        },
    },
    state::AppState,
    validation::{IdPath, MemberOfPath, Valid, ValidPath, ValidQuery},
};

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "Sessions",
    params(SessionListQuery),
    responses(
        (status = 200, description = "Sessions", body = ApiResponse<Paginated<SessionView>>)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidQuery(query): ValidQuery<SessionListQuery>,
) -> Result<ApiJson<Paginated<SessionView>>, ApiError> {
    let page = sessions::list(&state, query, viewer.as_ref(), Utc::now()).await?;
    Ok(ApiResponse::ok(page))
}

/// Session details. The participant list is only shown to facilitators and admins.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session", body = ApiResponse<SessionView>),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<SessionView>, ApiError> {
    Ok(ApiResponse::ok(sessions::get(&state, &path.id, viewer.as_ref()).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = ApiResponse<SessionView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not authorized (peer educator or admin required)")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    Authorized(facilitator, _): FacilitatorOnly,
    Valid(req): Valid<CreateSessionRequest>,
) -> Result<Created<SessionView>, ApiError> {
    let session = sessions::create(&state, &facilitator, req, Utc::now()).await?;
    Ok(ApiResponse::created(session))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    security(("bearer_auth" = [])),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = ApiResponse<SessionView>),
        (status = 400, description = "Validation failed or session closed"),
        (status = 403, description = "Not a facilitator of this session")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Auth(facilitator): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateSessionRequest>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::update(&state, &facilitator, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(session))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/status",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    security(("bearer_auth" = [])),
    request_body = SessionStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<SessionView>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not a facilitator of this session")
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    Auth(facilitator): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<SessionStatusRequest>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::set_status(&state, &facilitator, &path.id, req.status, Utc::now()).await?;
    Ok(ApiResponse::ok(session))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/cancel",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session cancelled", body = ApiResponse<SessionView>),
        (status = 400, description = "Session already closed"),
        (status = 403, description = "Not a facilitator of this session")
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    Auth(facilitator): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::cancel(&state, &facilitator, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(session, "Session cancelled"))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/join",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Joined", body = ApiResponse<SessionView>),
        (status = 400, description = "Session full, closed or already joined"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn join(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::join(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(session, "Joined session"))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}/join",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Left session", body = ApiResponse<SessionView>),
        (status = 400, description = "Not a participant")
    )
)]
pub async fn leave(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::leave(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(session, "Left session"))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/attendance/{user_id}",
    tag = "Sessions",
    params(
        ("id" = String, Path, description = "Session id"),
        ("user_id" = String, Path, description = "Participant")
    ),
    security(("bearer_auth" = [])),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = ApiResponse<SessionView>),
        (status = 403, description = "Not a facilitator of this session"),
        (status = 404, description = "Session or participant not found")
    )
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    Auth(facilitator): Auth,
    ValidPath(path): ValidPath<MemberOfPath>,
    Valid(req): Valid<AttendanceRequest>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session = sessions::mark_attendance(
        &state,
        &facilitator,
        &path.id,
        &path.user_id,
        req.attended,
        Utc::now(),
    )
    .await?;
    Ok(ApiResponse::ok(session))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/scores/{user_id}",
    tag = "Sessions",
    params(
        ("id" = String, Path, description = "Session id"),
        ("user_id" = String, Path, description = "Participant")
    ),
    security(("bearer_auth" = [])),
    request_body = ScoresRequest,
    responses(
        (status = 200, description = "Scores recorded", body = ApiResponse<SessionView>),
        (status = 400, description = "Scores out of range"),
        (status = 403, description = "Not a facilitator of this session")
    )
)]
pub async fn record_scores(
    State(state): State<AppState>,
    Auth(facilitator): Auth,
    ValidPath(path): ValidPath<MemberOfPath>,
    Valid(req): Valid<ScoresRequest>,
) -> Result<ApiJson<SessionView>, ApiError> {
    let session =
        sessions::record_scores(&state, &facilitator, &path.id, &path.user_id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(session))
}
