// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anonymous Q&A: public submission, moderation, answers and verification.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{load, matches_search};
use crate::{
    audit_log,
    auth::AuthenticatedUser,
    domain::{clean_tags, AnonymousQuestion, Feature, QuestionCategory, QuestionStatus},
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::AuditEventType,
    validation::{Validate, Validator},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitQuestionRequest {
    pub question: String,
    #[serde(default)]
    pub category: QuestionCategory,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for SubmitQuestionRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("question", &self.question, 10, 2000);
        v.check(self.tags.len() <= 10, "tags", "at most 10 tags");
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct QuestionListQuery {
    pub category: Option<QuestionCategory>,
    /// Queue only.
    pub status: Option<QuestionStatus>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for QuestionListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

impl QuestionListQuery {
    fn matches(&self, q: &AnonymousQuestion) -> bool {
        self.category.is_none_or(|c| q.category == c)
            && matches_search(self.search.as_deref(), &[&q.question])
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ModerateQuestionRequest {
    /// One of `approved`, `rejected`, `archived`.
    pub status: QuestionStatus,
    /// Hide an answered question from the public board.
    pub is_public: Option<bool>,
}

impl Validate for ModerateQuestionRequest {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnswerRequest {
    pub answer: String,
}

impl Validate for AnswerRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("answer", &self.answer, 10, 5000);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct HelpfulRequest {
    pub helpful: bool,
}

impl Validate for HelpfulRequest {
    fn validate(&self, _v: &mut Validator) {}
}

/// Public submission. Nothing identifying the submitter is stored.
pub async fn submit(state: &AppState, req: SubmitQuestionRequest, now: DateTime<Utc>) -> ServiceResult<AnonymousQuestion> {
    state.settings().await.ensure_enabled(Feature::AnonymousQuestions)?;

    let question = AnonymousQuestion::new(
        req.question.trim().to_string(),
        req.category,
        clean_tags(req.tags),
        now,
    );
    state.storage().collection::<AnonymousQuestion>().insert(&question)?;
    tracing::info!(question_id = %question.id, category = ?question.category, "Anonymous question submitted");
    Ok(question)
}

/// Answered public questions, most recently answered first.
pub async fn list_public(state: &AppState, query: QuestionListQuery) -> ServiceResult<Paginated<AnonymousQuestion>> {
    let mut questions = state
        .storage()
        .collection::<AnonymousQuestion>()
        .find(|q| q.is_publicly_visible() && query.matches(q))?;
    questions.sort_by_key(|q| std::cmp::Reverse(q.answer.as_ref().map(|a| a.answered_at)));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(questions, params))
}

pub async fn get_public(state: &AppState, id: &str) -> ServiceResult<AnonymousQuestion> {
    let question: AnonymousQuestion = load(state.storage(), id)?;
    if question.is_publicly_visible() {
        Ok(question)
    } else {
        Err(ServiceError::not_found("Question not found"))
    }
}

/// Every question for staff, oldest first. Defaults to open questions.
pub async fn queue(state: &AppState, query: QuestionListQuery) -> ServiceResult<Paginated<AnonymousQuestion>> {
    let mut questions = state.storage().collection::<AnonymousQuestion>().find(|q| {
        let status_ok = match query.status {
            Some(status) => q.status == status,
            None => matches!(q.status, QuestionStatus::Pending | QuestionStatus::Approved),
        };
        status_ok && query.matches(q)
    })?;
    questions.sort_by_key(|q| q.submitted_at);

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(questions, params))
}

pub async fn moderate(
    state: &AppState,
    moderator: &AuthenticatedUser,
    id: &str,
    req: ModerateQuestionRequest,
    now: DateTime<Utc>,
) -> ServiceResult<AnonymousQuestion> {
    let question = {
        let _gate = state.exclusive().await;
        let mut question: AnonymousQuestion = load(state.storage(), id)?;
        question.moderate(req.status, now)?;
        if let Some(is_public) = req.is_public {
            question.is_public = is_public;
        }
        state.storage().collection::<AnonymousQuestion>().save(&question)?;
        question
    };

    audit_log!(state.storage(), AuditEventType::QuestionModerated, moderator, "question", id);
    Ok(question)
}

pub async fn answer(
    state: &AppState,
    responder: &AuthenticatedUser,
    id: &str,
    req: AnswerRequest,
    now: DateTime<Utc>,
) -> ServiceResult<AnonymousQuestion> {
    let question = {
        let _gate = state.exclusive().await;
        let mut question: AnonymousQuestion = load(state.storage(), id)?;
        question.answer(&responder.user_id, req.answer.trim().to_string(), now)?;
        state.storage().collection::<AnonymousQuestion>().save(&question)?;
        question
    };

    audit_log!(state.storage(), AuditEventType::QuestionAnswered, responder, "question", id);
    tracing::info!(question_id = %id, responder = %responder.user_id, "Question answered");
    Ok(question)
}

pub async fn verify(
    state: &AppState,
    verifier: &AuthenticatedUser,
    id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<AnonymousQuestion> {
    let _gate = state.exclusive().await;
    let mut question: AnonymousQuestion = load(state.storage(), id)?;
    question.verify(&verifier.user_id, now)?;
    state.storage().collection::<AnonymousQuestion>().save(&question)?;
    Ok(question)
}

/// Public vote on any question still open.
pub async fn mark_helpful(state: &AppState, id: &str, helpful: bool, now: DateTime<Utc>) -> ServiceResult<AnonymousQuestion> {
    let _gate = state.exclusive().await;
    let mut question: AnonymousQuestion = load(state.storage(), id)?;
    if question.is_closed() {
        return Err(ServiceError::not_found("Question not found"));
    }
    question.mark_helpful(helpful, now);
    state.storage().collection::<AnonymousQuestion>().save(&question)?;
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    fn request(category: QuestionCategory) -> SubmitQuestionRequest {
        SubmitQuestionRequest {
            question: "Is it normal to feel anxious before exams?".into(),
            category,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn other_question_marked_helpful_right_after_submission() {
        let (state, _temp) = test_state();
        let now = Utc::now();

        let question = submit(&state, request(QuestionCategory::Other), now).await.unwrap();
        assert_eq!(question.category, QuestionCategory::Other);
        assert_eq!(question.status, QuestionStatus::Pending);
        assert_eq!((question.helpful, question.not_helpful), (0, 0));

        let voted = mark_helpful(&state, &question.id, true, now).await.unwrap();
        assert_eq!((voted.helpful, voted.not_helpful), (1, 0));
        assert_eq!(voted.status, QuestionStatus::Pending);

        // Still off the public board until answered.
        assert!(get_public(&state, &question.id).await.is_err());
    }

    #[tokio::test]
    async fn answered_question_reaches_the_board() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let advisor = principal(&state, "advisor", &[Role::Advisor]);

        let question = submit(&state, request(QuestionCategory::Other), now).await.unwrap();
        let answer_req = AnswerRequest { answer: "Yes, and the counselling centre can help.".into() };
        answer(&state, &advisor, &question.id, answer_req, now).await.unwrap();

        let voted = mark_helpful(&state, &question.id, false, now).await.unwrap();
        assert_eq!((voted.helpful, voted.not_helpful), (0, 1));

        let board = list_public(&state, QuestionListQuery::default()).await.unwrap();
        assert_eq!(board.total, 1);
    }

    #[tokio::test]
    async fn queue_holds_open_questions_until_closed() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let moderator = principal(&state, "mod", &[Role::Moderator]);

        let question = submit(&state, request(QuestionCategory::MentalHealth), now).await.unwrap();
        assert_eq!(queue(&state, QuestionListQuery::default()).await.unwrap().total, 1);

        let reject = ModerateQuestionRequest { status: QuestionStatus::Rejected, is_public: None };
        moderate(&state, &moderator, &question.id, reject, now).await.unwrap();
        assert_eq!(queue(&state, QuestionListQuery::default()).await.unwrap().total, 0);

        let again = ModerateQuestionRequest { status: QuestionStatus::Approved, is_public: None };
        assert!(matches!(
            moderate(&state, &moderator, &question.id, again, now).await,
            Err(ServiceError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn hidden_answer_is_off_the_board() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let responder = principal(&state, "pe", &[Role::PeerEducator]);
        let moderator = principal(&state, "mod", &[Role::Moderator]);

        let question = submit(&state, request(QuestionCategory::Nutrition), now).await.unwrap();
        let answer_req = AnswerRequest { answer: "Aim for a balanced plate at each meal.".into() };
        answer(&state, &responder, &question.id, answer_req, now).await.unwrap();

        let archive = ModerateQuestionRequest { status: QuestionStatus::Archived, is_public: Some(false) };
        moderate(&state, &moderator, &question.id, archive, now).await.unwrap();
        assert!(matches!(
            mark_helpful(&state, &question.id, true, now).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn submissions_can_be_switched_off() {
        let (state, _temp) = test_state();
        let mut settings = state.settings().await;
        settings.features.anonymous_questions = false;
        state.replace_settings(settings).await.unwrap();

        assert!(matches!(
            submit(&state, request(QuestionCategory::Other), Utc::now()).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
