// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Event endpoints and the registration workflow.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{AdminOnly, Auth, Authorized, OptionalAuth},
    domain::{EventView, Registration},
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::events::{
        self, AttendanceRequest, CreateEventRequest, EventFeedbackRequest, EventListQuery,
        UpdateEventRequest,
    },
    state::AppState,
    validation::{IdPath, MemberOfPath, Valid, ValidPath, ValidQuery},
};

/// List events, soonest first.
///
/// Drafts are only visible to admins and the event's organizers.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    params(EventListQuery),
    responses(
        (status = 200, description = "Events", body = ApiResponse<Paginated<EventView>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidQuery(query): ValidQuery<EventListQuery>,
) -> Result<ApiJson<Paginated<EventView>>, ApiError> {
    let page = events::list(&state, query, viewer.as_ref(), Utc::now()).await?;
    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = ApiResponse<EventView>),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<EventView>, ApiError> {
    let event = events::get(&state, &path.id, viewer.as_ref(), Utc::now()).await?;
    Ok(ApiResponse::ok(event))
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    security(("bearer_auth" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = ApiResponse<EventView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<CreateEventRequest>,
) -> Result<Created<EventView>, ApiError> {
    let event = events::create(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::created(event))
}

/// Update an event. Allowed to admins and the event's organizers.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = ApiResponse<EventView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not an admin or organizer"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateEventRequest>,
) -> Result<ApiJson<EventView>, ApiError> {
    let event = events::update(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(event))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event deleted"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    events::delete(&state, &admin, &path.id).await?;
    Ok(ApiResponse::message("Event deleted"))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/register",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered", body = ApiResponse<EventView>),
        (status = 400, description = "Event full, registration closed or already registered"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<EventView>, ApiError> {
    let event = events::register(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(event, "Registered for event"))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}/register",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registration cancelled", body = ApiResponse<EventView>),
        (status = 400, description = "Not registered or cancellation not allowed"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn unregister(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<EventView>, ApiError> {
    let event = events::unregister(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(event, "Registration cancelled"))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/registrations",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registrations", body = ApiResponse<Vec<Registration>>),
        (status = 403, description = "Not an admin or organizer")
    )
)]
pub async fn registrations(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<Vec<Registration>>, ApiError> {
    Ok(ApiResponse::ok(events::registrations(&state, &user, &path.id).await?))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}/attendance/{user_id}",
    tag = "Events",
    params(
        ("id" = String, Path, description = "Event id"),
        ("user_id" = String, Path, description = "Registered user")
    ),
    security(("bearer_auth" = [])),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = ApiResponse<Registration>),
        (status = 403, description = "Not an admin or organizer"),
        (status = 404, description = "Event or registration not found")
    )
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<MemberOfPath>,
    Valid(req): Valid<AttendanceRequest>,
) -> Result<ApiJson<Registration>, ApiError> {
    let registration =
        events::mark_attendance(&state, &user, &path.id, &path.user_id, req.attended, Utc::now()).await?;
    Ok(ApiResponse::ok(registration))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/feedback",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    request_body = EventFeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = ApiResponse<Registration>),
        (status = 400, description = "Not registered or rating out of range"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<EventFeedbackRequest>,
) -> Result<ApiJson<Registration>, ApiError> {
    let registration = events::submit_feedback(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(registration))
}

/// Events the caller is registered for.
#[utoipa::path(
    get,
    path = "/api/events/mine",
    tag = "Events",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered events", body = ApiResponse<Vec<EventView>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn mine(State(state): State<AppState>, Auth(user): Auth) -> Result<ApiJson<Vec<EventView>>, ApiError> {
    Ok(ApiResponse::ok(events::my_events(&state, &user, Utc::now()).await?))
}
