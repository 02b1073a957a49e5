// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anonymous question board.
//!
//! Submitting, browsing and voting need no account. The review pipeline is
//! split across moderators (approve/reject), responders (answer) and
//! verifiers (sign off on answers).

use axum::extract::State;
use chrono::Utc;

use crate::{
    auth::{Authorized, ModeratorOnly, ResponderOnly, VerifierOnly},
    domain::AnonymousQuestion,
    error::ApiError,
    models::{ApiJson, ApiResponse, Created, Paginated},
    services::questions::{
        self, AnswerRequest, HelpfulRequest, ModerateQuestionRequest, QuestionListQuery,
        SubmitQuestionRequest,
    },
    state::AppState,
    validation::{IdPath, Valid, ValidPath, ValidQuery},
};

#[utoipa::path(
    post,
    path = "/api/questions",
    tag = "Questions",
    request_body = SubmitQuestionRequest,
    responses(
        (status = 201, description = "Question submitted for moderation", body = ApiResponse<AnonymousQuestion>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Anonymous questions are disabled")
    )
)]
pub async fn submit(
    State(state): State<AppState>,
    Valid(req): Valid<SubmitQuestionRequest>,
) -> Result<Created<AnonymousQuestion>, ApiError> {
    let question = questions::submit(&state, req, Utc::now()).await?;
    Ok(ApiResponse::created(question))
}

/// Answered public questions, newest answer first.
#[utoipa::path(
    get,
    path = "/api/questions",
    tag = "Questions",
    params(QuestionListQuery),
    responses(
        (status = 200, description = "Answered questions", body = ApiResponse<Paginated<AnonymousQuestion>>)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<QuestionListQuery>,
) -> Result<ApiJson<Paginated<AnonymousQuestion>>, ApiError> {
    Ok(ApiResponse::ok(questions::list_public(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    tag = "Questions",
    params(("id" = String, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question", body = ApiResponse<AnonymousQuestion>),
        (status = 404, description = "Question not found or not public")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<AnonymousQuestion>, ApiError> {
    Ok(ApiResponse::ok(questions::get_public(&state, &path.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/questions/{id}/helpful",
    tag = "Questions",
    params(("id" = String, Path, description = "Question id")),
    request_body = HelpfulRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ApiResponse<AnonymousQuestion>),
        (status = 404, description = "Question not found or closed")
    )
)]
pub async fn helpful(
    State(state): State<AppState>,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<HelpfulRequest>,
) -> Result<ApiJson<AnonymousQuestion>, ApiError> {
    let question = questions::mark_helpful(&state, &path.id, req.helpful, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(question, "Thanks for the feedback"))
}

/// Review queue, oldest first. Defaults to pending and approved questions.
#[utoipa::path(
    get,
    path = "/api/questions/queue",
    tag = "Questions",
    params(QuestionListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Questions awaiting action", body = ApiResponse<Paginated<AnonymousQuestion>>),
        (status = 403, description = "Not authorized (moderator required)")
    )
)]
pub async fn queue(
    State(state): State<AppState>,
    _moderator: ModeratorOnly,
    ValidQuery(query): ValidQuery<QuestionListQuery>,
) -> Result<ApiJson<Paginated<AnonymousQuestion>>, ApiError> {
    Ok(ApiResponse::ok(questions::queue(&state, query).await?))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/moderate",
    tag = "Questions",
    params(("id" = String, Path, description = "Question id")),
    security(("bearer_auth" = [])),
    request_body = ModerateQuestionRequest,
    responses(
        (status = 200, description = "Question moderated", body = ApiResponse<AnonymousQuestion>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not authorized (moderator required)"),
        (status = 404, description = "Question not found")
    )
)]
pub async fn moderate(
    State(state): State<AppState>,
    Authorized(moderator, _): ModeratorOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<ModerateQuestionRequest>,
) -> Result<ApiJson<AnonymousQuestion>, ApiError> {
    let question = questions::moderate(&state, &moderator, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(question))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/answer",
    tag = "Questions",
    params(("id" = String, Path, description = "Question id")),
    security(("bearer_auth" = [])),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Question answered", body = ApiResponse<AnonymousQuestion>),
        (status = 400, description = "Question must be approved first"),
        (status = 403, description = "Not authorized (advisor, peer educator or admin required)")
    )
)]
pub async fn answer(
    State(state): State<AppState>,
    Authorized(responder, _): ResponderOnly,
    ValidPath(path): ValidPath<IdPath>,
    Valid(req): Valid<AnswerRequest>,
) -> Result<ApiJson<AnonymousQuestion>, ApiError> {
    let question = questions::answer(&state, &responder, &path.id, req, Utc::now()).await?;
    Ok(ApiResponse::ok(question))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/verify",
    tag = "Questions",
    params(("id" = String, Path, description = "Question id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Answer verified", body = ApiResponse<AnonymousQuestion>),
        (status = 400, description = "Question has no answer"),
        (status = 403, description = "Not authorized (advisor or admin required)")
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Authorized(verifier, _): VerifierOnly,
    ValidPath(path): ValidPath<IdPath>,
) -> Result<ApiJson<AnonymousQuestion>, ApiError> {
    let question = questions::verify(&state, &verifier, &path.id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(question, "Answer verified"))
}
