// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource library and training endpoints.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{AdminOnly, Auth, Authorized, OptionalAuth},
    domain::{ResourceView, TrainingProgress, TrainingView},
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::library::{
        self, CompleteRequest, CreateResourceRequest, CreateTrainingRequest, MyCompletions,
        RateRequest, ResourceListQuery, UpdateResourceRequest, UpdateTrainingRequest,
    },
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery},
};

// =============================================================================
// Resources
// =============================================================================

/// List resources the caller may read.
///
/// Anonymous callers only see public resources.
#[utoipa::path(
    get,
    path = "/api/resources",
    tag = "Resources",
    params(ResourceListQuery),
    responses(
        (status = 200, description = "Resources", body = ApiResponse<Paginated<ResourceView>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_resources(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidQuery(query): ValidQuery<ResourceListQuery>,
) -> Result<ApiJson<Paginated<ResourceView>>, ApiError> {
    Ok(ApiResponse::ok(library::list_resources(&state, query, viewer.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource", body = ApiResponse<ResourceView>),
        (status = 401, description = "Authentication required for this access level"),
        (status = 403, description = "Access level not met"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<ResourceView>, ApiError> {
    Ok(ApiResponse::ok(library::get_resource(&state, &path.id, viewer.as_ref()).await?))
}

#[utoipa::path(
    post,
    path = "/api/resources",
    tag = "Resources",
    security(("bearer_auth" = [])),
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ApiResponse<ResourceView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_resource(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<CreateResourceRequest>,
) -> Result<Created<ResourceView>, ApiError> {
    let resource = library::create_resource(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::created(resource))
}

#[utoipa::path(
    put,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    security(("bearer_auth" = [])),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ApiResponse<ResourceView>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn update_resource(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateResourceRequest>,
) -> Result<ApiJson<ResourceView>, ApiError> {
    let resource = library::update_resource(&state, &admin, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(resource))
}

#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    library::delete_resource(&state, &admin, &path.id).await?;
    Ok(ApiResponse::message("Resource deleted"))
}

/// Record (or update) the caller's completion of a resource.
#[utoipa::path(
    post,
    path = "/api/resources/{id}/complete",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    security(("bearer_auth" = [])),
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Completion recorded", body = ApiResponse<ResourceView>),
        (status = 403, description = "Access level not met"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn complete_resource(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<CompleteRequest>,
) -> Result<ApiJson<ResourceView>, ApiError> {
    let resource = library::complete_resource(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(resource, "Completion recorded"))
}

#[utoipa::path(
    post,
    path = "/api/resources/{id}/rate",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    security(("bearer_auth" = [])),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating recorded", body = ApiResponse<ResourceView>),
        (status = 400, description = "Score must be between 1 and 5"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn rate_resource(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<RateRequest>,
) -> Result<ApiJson<ResourceView>, ApiError> {
    let resource = library::rate_resource(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(resource))
}

#[utoipa::path(
    get,
    path = "/api/resources/completions/mine",
    tag = "Resources",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Completed resources and training", body = ApiResponse<MyCompletions>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_completions(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<ApiJson<MyCompletions>, ApiError> {
    Ok(ApiResponse::ok(library::my_completions(&state, &user).await?))
}

// =============================================================================
// Training
// =============================================================================

/// Training targeted at the caller's roles, in sequence order.
#[utoipa::path(
    get,
    path = "/api/training",
    tag = "Training",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Training content", body = ApiResponse<Vec<TrainingView>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_training(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<ApiJson<Vec<TrainingView>>, ApiError> {
    Ok(ApiResponse::ok(library::list_training(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/training/{id}",
    tag = "Training",
    params(("id" = String, Path, description = "Training id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Training content", body = ApiResponse<TrainingView>),
        (status = 404, description = "Not found or not targeted at the caller")
    )
)]
pub async fn get_training(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<TrainingView>, ApiError> {
    Ok(ApiResponse::ok(library::get_training(&state, &user, &path.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/training",
    tag = "Training",
    security(("bearer_auth" = [])),
    request_body = CreateTrainingRequest,
    responses(
        (status = 201, description = "Training created", body = ApiResponse<TrainingView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_training(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    Valid(req): Valid<CreateTrainingRequest>,
) -> Result<Created<TrainingView>, ApiError> {
    let item = library::create_training(&state, &admin, req, Utc::now()).await?;
    Ok(ApiResponse::created(item))
}

#[utoipa::path(
    put,
    path = "/api/training/{id}",
    tag = "Training",
    params(("id" = String, Path, description = "Training id")),
    security(("bearer_auth" = [])),
    request_body = UpdateTrainingRequest,
    responses(
        (status = 200, description = "Training updated", body = ApiResponse<TrainingView>),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Training not found")
    )
)]
pub async fn update_training(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateTrainingRequest>,
) -> Result<ApiJson<TrainingView>, ApiError> {
    let item = library::update_training(&state, &admin, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    delete,
    path = "/api/training/{id}",
    tag = "Training",
    params(("id" = String, Path, description = "Training id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Training deleted"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Training not found")
    )
)]
pub async fn delete_training(
    State(state): State<AppState>,
    Authorized(admin, _): AdminOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<()>, ApiError> {
    library::delete_training(&state, &admin, &path.id).await?;
    Ok(ApiResponse::message("Training deleted"))
}

#[utoipa::path(
    post,
    path = "/api/training/{id}/complete",
    tag = "Training",
    params(("id" = String, Path, description = "Training id")),
    security(("bearer_auth" = [])),
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Completion recorded", body = ApiResponse<TrainingView>),
        (status = 404, description = "Not found or not targeted at the caller")
    )
)]
pub async fn complete_training(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<CompleteRequest>,
) -> Result<ApiJson<TrainingView>, ApiError> {
    let item = library::complete_training(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(item, "Completion recorded"))
}

/// Required-training progress for the caller.
#[utoipa::path(
    get,
    path = "/api/training/progress",
    tag = "Training",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Progress", body = ApiResponse<TrainingProgress>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn progress(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<ApiJson<TrainingProgress>, ApiError> {
    Ok(ApiResponse::ok(library::progress(&state, &user).await?))
}
