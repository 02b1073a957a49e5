// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Member stories and photo galleries.
//!
//! Drafts are private to their owner until submitted. Moderators approve or
//! reject submissions and release held comments.

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{Auth, Authorized, ModeratorOnly, OptionalAuth},
    domain::{Comment, Gallery, GalleryView, Story, StoryView},
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::moderation::{
        self, CommentRequest, ContentListQuery, CreateGalleryRequest, CreateStoryRequest,
        LikeResult, ModerationQueue, ReviewRequest, UpdateGalleryRequest, UpdateStoryRequest,
    },
    state::AppState,
    validation::{CommentPath, IdPath, Valid, ValidPath, ValidQuery},
};

/// Everything waiting for a moderator: submitted stories and galleries plus
/// held comments.
#[utoipa::path(
    get,
    path = "/api/moderation/queue",
    tag = "Moderation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Moderation queue", body = ApiResponse<ModerationQueue>),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn queue(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
) -> Result<ApiJson<ModerationQueue>, ApiError> {
    Ok(ApiResponse::ok(moderation::queue(&state, &moderator).await?))
}

// =============================================================================
// Stories
// =============================================================================

/// Published stories, newest first.
#[utoipa::path(
    get,
    path = "/api/stories",
    tag = "Stories",
    params(ContentListQuery),
    responses(
        (status = 200, description = "Published stories", body = ApiResponse<Paginated<StoryView>>)
    )
)]
pub async fn list_stories(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidQuery(query): ValidQuery<ContentListQuery>,
) -> Result<ApiJson<Paginated<StoryView>>, ApiError> {
    Ok(ApiResponse::ok(moderation::list_published::<Story>(&state, query, viewer.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/stories/mine",
    tag = "Stories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's stories in every state", body = ApiResponse<Vec<StoryView>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_stories(State(state): State<AppState>, Auth(user): Auth) -> Result<ApiJson<Vec<StoryView>>, ApiError> {
    Ok(ApiResponse::ok(moderation::mine::<Story>(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/stories/{id}",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    responses(
        (status = 200, description = "Story", body = ApiResponse<StoryView>),
        (status = 404, description = "Story not found or not visible")
    )
)]
pub async fn get_story(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<StoryView>, ApiError> {
    Ok(ApiResponse::ok(moderation::get::<Story>(&state, &path.id, viewer.as_ref()).await?))
}

#[utoipa::path(
    post,
    path = "/api/stories",
    tag = "Stories",
    security(("bearer_auth" = [])),
    request_body = CreateStoryRequest,
    responses(
        (status = 201, description = "Story drafted", body = ApiResponse<StoryView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Feature disabled")
    )
)]
pub async fn create_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<CreateStoryRequest>,
) -> Result<Created<StoryView>, ApiError> {
    let item = moderation::create_story(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::created(item))
}

/// Edit a draft or rejected story. Owner only.
#[utoipa::path(
    put,
    path = "/api/stories/{id}",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    request_body = UpdateStoryRequest,
    responses(
        (status = 200, description = "Story updated", body = ApiResponse<StoryView>),
        (status = 400, description = "Not editable in its current state"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn update_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateStoryRequest>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::update_story(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/stories/{id}/submit",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submitted for review", body = ApiResponse<StoryView>),
        (status = 400, description = "Only drafts and rejected stories can be submitted"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn submit_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::submit::<Story>(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(item, "Submitted for review"))
}

#[utoipa::path(
    post,
    path = "/api/stories/{id}/approve",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Story published", body = ApiResponse<StoryView>),
        (status = 400, description = "Not pending review"),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn approve_story(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<ReviewRequest>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::approve::<Story>(&state, &moderator, &path.id, req.notes, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/stories/{id}/reject",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Story rejected", body = ApiResponse<StoryView>),
        (status = 400, description = "Not pending review"),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn reject_story(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<ReviewRequest>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::reject::<Story>(&state, &moderator, &path.id, req.notes, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

/// Archive a story. Owner or moderator.
#[utoipa::path(
    post,
    path = "/api/stories/{id}/archive",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Story archived", body = ApiResponse<StoryView>),
        (status = 403, description = "Not the owner or a moderator")
    )
)]
pub async fn archive_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::archive::<Story>(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/stories/{id}/like",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Like toggled", body = ApiResponse<LikeResult>),
        (status = 400, description = "Story is not published")
    )
)]
pub async fn like_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<LikeResult>, ApiError> {
    Ok(ApiResponse::ok(moderation::toggle_like::<Story>(&state, &user, &path.id).await?))
}

/// Comment on a published story. Comments are held until a moderator approves them.
#[utoipa::path(
    post,
    path = "/api/stories/{id}/comments",
    tag = "Stories",
    params(("id" = String, Path, description = "Story id")),
    security(("bearer_auth" = [])),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment held for moderation", body = ApiResponse<Comment>),
        (status = 400, description = "Story is not published")
    )
)]
pub async fn comment_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<CommentRequest>,
) -> Result<Created<Comment>, ApiError> {
    let comment = moderation::add_comment::<Story>(&state, &user, &path.id, req.text, Utc::now()).await?;
    Ok(ApiResponse::created(comment))
}

#[utoipa::path(
    post,
    path = "/api/stories/{id}/comments/{comment_id}/approve",
    tag = "Stories",
    params(
        ("id" = String, Path, description = "Story id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Comment approved", body = ApiResponse<StoryView>),
        (status = 403, description = "Not authorized (moderator required)"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn approve_story_comment(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<CommentPath>,
) -> Result<ApiJson<StoryView>, ApiError> {
    let item = moderation::approve_comment::<Story>(&state, &moderator, &path.id, &path.comment_id, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

/// Remove a comment. Comment author or story owner.
#[utoipa::path(
    delete,
    path = "/api/stories/{id}/comments/{comment_id}",
    tag = "Stories",
    params(
        ("id" = String, Path, description = "Story id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Comment removed"),
        (status = 403, description = "Not the comment author or owner"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_story_comment(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<CommentPath>,
) -> Result<ApiJson<()>, ApiError> {
    moderation::delete_comment::<Story>(&state, &user, &path.id, &path.comment_id, Utc::now()).await?;
    Ok(ApiResponse::message("Comment removed"))
}

// =============================================================================
// Galleries
// =============================================================================

/// Published galleries, newest first.
#[utoipa::path(
    get,
    path = "/api/galleries",
    tag = "Galleries",
    params(ContentListQuery),
    responses(
        (status = 200, description = "Published galleries", body = ApiResponse<Paginated<GalleryView>>)
    )
)]
pub async fn list_galleries(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidQuery(query): ValidQuery<ContentListQuery>,
) -> Result<ApiJson<Paginated<GalleryView>>, ApiError> {
    Ok(ApiResponse::ok(moderation::list_published::<Gallery>(&state, query, viewer.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/galleries/mine",
    tag = "Galleries",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's galleries in every state", body = ApiResponse<Vec<GalleryView>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_galleries(State(state): State<AppState>, Auth(user): Auth) -> Result<ApiJson<Vec<GalleryView>>, ApiError> {
    Ok(ApiResponse::ok(moderation::mine::<Gallery>(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/galleries/{id}",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    responses(
        (status = 200, description = "Gallery", body = ApiResponse<GalleryView>),
        (status = 404, description = "Gallery not found or not visible")
    )
)]
pub async fn get_gallery(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    Ok(ApiResponse::ok(moderation::get::<Gallery>(&state, &path.id, viewer.as_ref()).await?))
}

#[utoipa::path(
    post,
    path = "/api/galleries",
    tag = "Galleries",
    security(("bearer_auth" = [])),
    request_body = CreateGalleryRequest,
    responses(
        (status = 201, description = "Gallery drafted", body = ApiResponse<GalleryView>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Feature disabled")
    )
)]
pub async fn create_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    Valid(req): Valid<CreateGalleryRequest>,
) -> Result<Created<GalleryView>, ApiError> {
    let item = moderation::create_gallery(&state, &user, req, Utc::now()).await?;
    Ok(ApiResponse::created(item))
}

/// Edit a draft or rejected gallery. Owner only.
#[utoipa::path(
    put,
    path = "/api/galleries/{id}",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    request_body = UpdateGalleryRequest,
    responses(
        (status = 200, description = "Gallery updated", body = ApiResponse<GalleryView>),
        (status = 400, description = "Not editable in its current state"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn update_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<UpdateGalleryRequest>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::update_gallery(&state, &user, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/galleries/{id}/submit",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submitted for review", body = ApiResponse<GalleryView>),
        (status = 400, description = "Only drafts and rejected galleries can be submitted"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn submit_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::submit::<Gallery>(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(item, "Submitted for review"))
}

#[utoipa::path(
    post,
    path = "/api/galleries/{id}/approve",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Gallery published", body = ApiResponse<GalleryView>),
        (status = 400, description = "Not pending review"),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn approve_gallery(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<ReviewRequest>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::approve::<Gallery>(&state, &moderator, &path.id, req.notes, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/galleries/{id}/reject",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Gallery rejected", body = ApiResponse<GalleryView>),
        (status = 400, description = "Not pending review"),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn reject_gallery(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<ReviewRequest>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::reject::<Gallery>(&state, &moderator, &path.id, req.notes, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

/// Archive a gallery. Owner or moderator.
#[utoipa::path(
    post,
    path = "/api/galleries/{id}/archive",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Gallery archived", body = ApiResponse<GalleryView>),
        (status = 403, description = "Not the owner or a moderator")
    )
)]
pub async fn archive_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::archive::<Gallery>(&state, &user, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

#[utoipa::path(
    post,
    path = "/api/galleries/{id}/like",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Like toggled", body = ApiResponse<LikeResult>),
        (status = 400, description = "Gallery is not published")
    )
)]
pub async fn like_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<LikeResult>, ApiError> {
    Ok(ApiResponse::ok(moderation::toggle_like::<Gallery>(&state, &user, &path.id).await?))
}

/// Comment on a published gallery. Comments are held until a moderator approves them.
#[utoipa::path(
    post,
    path = "/api/galleries/{id}/comments",
    tag = "Galleries",
    params(("id" = String, Path, description = "Gallery id")),
    security(("bearer_auth" = [])),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment held for moderation", body = ApiResponse<Comment>),
        (status = 400, description = "Gallery is not published")
    )
)]
pub async fn comment_gallery(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<CommentRequest>,
) -> Result<Created<Comment>, ApiError> {
    let comment = moderation::add_comment::<Gallery>(&state, &user, &path.id, req.text, Utc::now()).await?;
    Ok(ApiResponse::created(comment))
}

#[utoipa::path(
    post,
    path = "/api/galleries/{id}/comments/{comment_id}/approve",
    tag = "Galleries",
    params(
        ("id" = String, Path, description = "Gallery id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Comment approved", body = ApiResponse<GalleryView>),
        (status = 403, description = "Not authorized (moderator required)"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn approve_gallery_comment(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<CommentPath>,
) -> Result<ApiJson<GalleryView>, ApiError> {
    let item = moderation::approve_comment::<Gallery>(&state, &moderator, &path.id, &path.comment_id, Utc::now()).await?;
    Ok(ApiResponse::ok(item))
}

/// Remove a comment. Comment author or gallery owner.
#[utoipa::path(
    delete,
    path = "/api/galleries/{id}/comments/{comment_id}",
    tag = "Galleries",
    params(
        ("id" = String, Path, description = "Gallery id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Comment removed"),
        (status = 403, description = "Not the comment author or owner"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_gallery_comment(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidPath(path): ValidPath<CommentPath>,
) -> Result<ApiJson<()>, ApiError> {
    moderation::delete_comment::<Gallery>(&state, &user, &path.id, &path.comment_id, Utc::now()).await?;
    Ok(ApiResponse::message("Comment removed"))
}
