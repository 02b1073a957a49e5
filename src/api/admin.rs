// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints for running the club.
//!
//! These endpoints require the Admin role and provide:
//! - Dashboard counters and grouped reports
//! - User administration (roles, activation, deletion)
//! - Audit log queries
//! - System settings
//!
//! Granting or revoking admin-level roles additionally requires Superadmin.

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{AdminOnly, Authorized},
    domain::{SystemSettings, UserProfile},
    error::ApiError,
    models::{ApiJson, ApiResponse, Paginated},
    services::{
        admin::{
            self, AuditLogResponse, AuditQuery, DashboardStats, Report, ReportKind, SetActiveRequest,
            SetRolesRequest, UserListQuery,
        },
        settings::{self, UpdateSettingsRequest},
    },
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery, Validate, Validator},
};

/// `/reports/{kind}` path parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportPath {
    pub kind: ReportKind,
}

impl Validate for ReportPath {
    fn validate(&self, _v: &mut Validator) {}
}

// ============================================================================
// Dashboard & reports
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
) -> Result<ApiJson<DashboardStats>, ApiError> {
    Ok(ApiResponse::ok(admin::dashboard(&state, &admin, Utc::now()).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/{kind}",
    tag = "Admin",
    params(
        ("kind" = ReportKind, Path, description = "users-by-role, members-by-department, events-by-category, resources-by-category or stories-by-status")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Grouped counts", body = ApiResponse<Report>),
        (status = 400, description = "Unknown report"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn report(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<ReportPath>,
) -> Result<ApiJson<Report>, ApiError> {
    Ok(ApiResponse::ok(admin::report(&state, &admin, path.kind).await?))
}

// ============================================================================
// Users
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(UserListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users", body = ApiResponse<Paginated<UserProfile>>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidQuery(query): ValidQuery<UserListQuery>,
) -> Result<ApiJson<Paginated<UserProfile>>, ApiError> {
    Ok(ApiResponse::ok(admin::list_users(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserProfile>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<UserProfile>, ApiError> {
    Ok(ApiResponse::ok(admin::get_user(&state, &path.id).await?))
}

/// Replace a user's roles.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/roles",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    request_body = SetRolesRequest,
    responses(
        (status = 200, description = "Roles updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Empty role list or self-demotion"),
        (status = 403, description = "Privileged roles need a superadmin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_roles(
    State(state): State<AppState>,
    Authorized(actor, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<SetRolesRequest>,
) -> Result<ApiJson<UserProfile>, ApiError> {
    let profile = admin::set_roles(&state, &actor, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(profile, "Roles updated"))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/active",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Account status updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 403, description = "Privileged accounts need a superadmin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_active(
    State(state): State<AppState>,
    Authorized(actor, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<SetActiveRequest>,
) -> Result<ApiJson<UserProfile>, ApiError> {
    let profile = admin::set_active(&state, &actor, &path.id, req.is_active, Utc::now()).await?;
    Ok(ApiResponse::ok(profile))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Privileged accounts need a superadmin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Authorized(actor, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    admin::delete_user(&state, &actor, &path.id).await?;
    Ok(ApiResponse::message("User deleted"))
}

// ============================================================================
// Audit log
// ============================================================================

/// Query audit events.
///
/// Date range defaults to today. At most 1000 events per page.
#[utoipa::path(
    get,
    path = "/api/admin/audit",
    tag = "Admin",
    params(AuditQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = ApiResponse<AuditLogResponse>),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn query_audit(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidQuery(query): ValidQuery<AuditQuery>,
) -> Result<ApiJson<AuditLogResponse>, ApiError> {
    Ok(ApiResponse::ok(admin::query_audit(&state, &admin, query, Utc::now()).await?))
}

// ============================================================================
// Settings
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "System settings", body = ApiResponse<SystemSettings>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn get_settings(State(state): State<AppState>, _admin: AdminOnly) -> ApiJson<SystemSettings> {
    ApiResponse::ok(settings::get(&state).await)
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = ApiResponse<SystemSettings>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<UpdateSettingsRequest>,
) -> Result<ApiJson<SystemSettings>, ApiError> {
    let updated = settings::update(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(updated, "Settings updated"))
}
