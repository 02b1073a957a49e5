// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{load, matches_search};
use crate::{
    auth::AuthenticatedUser,
    domain::{Feedback, FeedbackStatus, FeedbackType},
    error::ServiceResult,
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    validation::{Validate, Validator},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitFeedbackRequest {
    #[serde(default)]
    pub feedback_type: FeedbackType,
    pub subject: String,
    pub message: String,
    pub rating: Option<u8>,
    /// Event, session or resource the feedback is about.
    pub related_id: Option<String>,
}

impl Validate for SubmitFeedbackRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("subject", &self.subject, 3, 200);
        v.length("message", &self.message, 10, 5000);
        v.optional_range("rating", self.rating, 1, 5);
        if let Some(related) = &self.related_id {
            v.uuid("related_id", related);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct FeedbackListQuery {
    pub feedback_type: Option<FeedbackType>,
    pub status: Option<FeedbackStatus>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for FeedbackListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RespondFeedbackRequest {
    pub response: String,
    /// Defaults to `resolved`.
    pub status: Option<FeedbackStatus>,
}

impl Validate for RespondFeedbackRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("response", &self.response, 1, 5000);
    }
}

/// Anonymous when `user` is `None`.
pub async fn submit(
    state: &AppState,
    user: Option<&AuthenticatedUser>,
    req: SubmitFeedbackRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Feedback> {
    let feedback = Feedback::new(
        user.map(|u| u.user_id.clone()),
        req.feedback_type,
        req.subject.trim().to_string(),
        req.message.trim().to_string(),
        req.rating,
        req.related_id,
        now,
    );
    state.storage().collection::<Feedback>().insert(&feedback)?;
    tracing::info!(feedback_id = %feedback.id, kind = ?feedback.feedback_type, "Feedback received");
    Ok(feedback)
}

/// Newest first.
pub async fn list(state: &AppState, query: FeedbackListQuery) -> ServiceResult<Paginated<Feedback>> {
    let mut items = state.storage().collection::<Feedback>().find(|f| {
        query.feedback_type.is_none_or(|t| f.feedback_type == t)
            && query.status.is_none_or(|s| f.status == s)
            && matches_search(query.search.as_deref(), &[&f.subject, &f.message])
    })?;
    items.sort_by_key(|f| std::cmp::Reverse(f.created_at));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(items, params))
}

pub async fn get(state: &AppState, id: &str) -> ServiceResult<Feedback> {
    load(state.storage(), id)
}

pub async fn respond(
    state: &AppState,
    admin: &AuthenticatedUser,
    id: &str,
    req: RespondFeedbackRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Feedback> {
    let _gate = state.exclusive().await;
    let mut feedback: Feedback = load(state.storage(), id)?;
    feedback.respond(&admin.user_id, req.response.trim().to_string(), req.status, now);
    state.storage().collection::<Feedback>().save(&feedback)?;
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    fn request(feedback_type: FeedbackType) -> SubmitFeedbackRequest {
        SubmitFeedbackRequest {
            feedback_type,
            subject: "Broken link".into(),
            message: "The resource page links to a missing file.".into(),
            rating: None,
            related_id: None,
        }
    }

    #[tokio::test]
    async fn anonymous_and_signed_in_feedback() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let member = principal(&state, "member", &[Role::Member]);

        let anonymous = submit(&state, None, request(FeedbackType::Website), now).await.unwrap();
        assert!(anonymous.user_id.is_none());

        let signed = submit(&state, Some(&member), request(FeedbackType::Resource), now).await.unwrap();
        assert_eq!(signed.user_id.as_deref(), Some(member.user_id.as_str()));

        let filtered = list(
            &state,
            FeedbackListQuery { feedback_type: Some(FeedbackType::Website), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(filtered.total, 1);
        assert_eq!(filtered.items[0].id, anonymous.id);
    }

    #[tokio::test]
    async fn respond_resolves() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let feedback = submit(&state, None, request(FeedbackType::General), now).await.unwrap();

        let req = RespondFeedbackRequest { response: "Fixed, thanks.".into(), status: None };
        let resolved = respond(&state, &admin, &feedback.id, req, now).await.unwrap();
        assert_eq!(resolved.status, FeedbackStatus::Resolved);

        let open = list(
            &state,
            FeedbackListQuery { status: Some(FeedbackStatus::New), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(open.total, 0);
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let mut req = request(FeedbackType::Event);
        req.rating = Some(6);
        assert!(req.validated().is_err());
    }
}
