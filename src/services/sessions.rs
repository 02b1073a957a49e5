// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-education sessions: scheduling, participation and outcome scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{assign, load, matches_search};
use crate::{
    audit_log,
    auth::AuthenticatedUser,
    domain::{
        new_id, HealthTopic, Participant, PeerEducationSession, SessionStatus, SessionSummary,
    },
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::AuditEventType,
    validation::{Validate, Validator},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub title: String,
    pub description: String,
    pub topic: String,
    #[serde(default)]
    pub category: HealthTopic,
    /// The creator is always a facilitator.
    #[serde(default)]
    pub facilitators: Vec<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub location: String,
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub materials: Vec<String>,
}

impl Validate for CreateSessionRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.length("description", &self.description, 10, 5000);
        v.length("topic", &self.topic, 2, 100);
        v.range("duration_minutes", self.duration_minutes, 15, 480);
        v.length("location", &self.location, 2, 200);
        v.optional_range("max_participants", self.max_participants, 1, 1000);
        for facilitator in &self.facilitators {
            v.uuid("facilitators", facilitator);
        }
        for material in &self.materials {
            v.url("materials", material);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub category: Option<HealthTopic>,
    pub facilitators: Option<Vec<String>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    /// `0` removes the cap.
    pub max_participants: Option<u32>,
    pub materials: Option<Vec<String>>,
}

impl Validate for UpdateSessionRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("description", self.description.as_deref(), 10, 5000);
        v.optional_length("topic", self.topic.as_deref(), 2, 100);
        v.optional_range("duration_minutes", self.duration_minutes, 15, 480);
        v.optional_length("location", self.location.as_deref(), 2, 200);
        v.optional_range("max_participants", self.max_participants, 0, 1000);
        for facilitator in self.facilitators.iter().flatten() {
            v.uuid("facilitators", facilitator);
        }
        for material in self.materials.iter().flatten() {
            v.url("materials", material);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SessionListQuery {
    pub category: Option<HealthTopic>,
    pub status: Option<SessionStatus>,
    pub upcoming: Option<bool>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for SessionListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SessionStatusRequest {
    pub status: SessionStatus,
}

impl Validate for SessionStatusRequest {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScoresRequest {
    /// 0-100
    pub pre_test_score: Option<u8>,
    /// 0-100
    pub post_test_score: Option<u8>,
}

impl Validate for ScoresRequest {
    fn validate(&self, v: &mut Validator) {
        v.check(
            self.pre_test_score.is_some() || self.post_test_score.is_some(),
            "scores",
            "at least one of pre_test_score or post_test_score is required",
        );
        v.optional_range("pre_test_score", self.pre_test_score, 0, 100);
        v.optional_range("post_test_score", self.post_test_score, 0, 100);
    }
}

/// Session with derived figures. Participant details are shown to
/// facilitators and admins only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub category: HealthTopic,
    pub facilitators: Vec<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub location: String,
    pub max_participants: Option<u32>,
    pub status: SessionStatus,
    pub materials: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    pub summary: SessionSummary,
    pub joined: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

fn can_manage(session: &PeerEducationSession, viewer: &AuthenticatedUser) -> bool {
    viewer.is_admin() || session.is_facilitator(&viewer.user_id)
}

fn view(session: PeerEducationSession, viewer: Option<&AuthenticatedUser>) -> SessionView {
    let summary = session.summary();
    let joined = viewer.is_some_and(|u| session.participant(&u.user_id).is_some());
    let manager = viewer.is_some_and(|u| can_manage(&session, u));
    SessionView {
        id: session.id,
        title: session.title,
        description: session.description,
        topic: session.topic,
        category: session.category,
        facilitators: session.facilitators,
        scheduled_at: session.scheduled_at,
        duration_minutes: session.duration_minutes,
        location: session.location,
        max_participants: session.max_participants,
        status: session.status,
        materials: session.materials,
        participants: manager.then_some(session.participants),
        summary,
        joined,
        created_by: session.created_by,
        created_at: session.created_at,
    }
}

fn ensure_manager(session: &PeerEducationSession, actor: &AuthenticatedUser) -> ServiceResult<()> {
    if can_manage(session, actor) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "Only facilitators or admins can manage this session",
        ))
    }
}

pub async fn create(
    state: &AppState,
    facilitator: &AuthenticatedUser,
    req: CreateSessionRequest,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    if req.scheduled_at <= now {
        return Err(ServiceError::field("scheduled_at", "scheduled_at must be in the future"));
    }
    let mut facilitators = req.facilitators;
    if !facilitators.contains(&facilitator.user_id) {
        facilitators.insert(0, facilitator.user_id.clone());
    }
    let session = PeerEducationSession {
        id: new_id(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        topic: req.topic.trim().to_string(),
        category: req.category,
        facilitators,
        scheduled_at: req.scheduled_at,
        duration_minutes: req.duration_minutes,
        location: req.location.trim().to_string(),
        max_participants: req.max_participants,
        status: SessionStatus::Scheduled,
        participants: Vec::new(),
        materials: req.materials,
        created_by: facilitator.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<PeerEducationSession>().insert(&session)?;
    audit_log!(storage, AuditEventType::SessionCreated, facilitator, "session", &session.id);

    Ok(view(session, Some(facilitator)))
}

pub async fn update(
    state: &AppState,
    actor: &AuthenticatedUser,
    session_id: &str,
    req: UpdateSessionRequest,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    ensure_manager(&session, actor)?;
    if matches!(session.status, SessionStatus::Cancelled | SessionStatus::Completed) {
        return Err(ServiceError::invalid(
            "Cancelled or completed sessions cannot be edited",
        ));
    }

    assign(&mut session.title, req.title.map(|t| t.trim().to_string()));
    assign(&mut session.description, req.description.map(|d| d.trim().to_string()));
    assign(&mut session.topic, req.topic.map(|t| t.trim().to_string()));
    assign(&mut session.category, req.category);
    assign(&mut session.facilitators, req.facilitators);
    assign(&mut session.scheduled_at, req.scheduled_at);
    assign(&mut session.duration_minutes, req.duration_minutes);
    assign(&mut session.location, req.location.map(|l| l.trim().to_string()));
    assign(&mut session.materials, req.materials);
    if let Some(max) = req.max_participants {
        if max > 0 && (max as usize) < session.participants.len() {
            return Err(ServiceError::field(
                "max_participants",
                "max_participants cannot be lower than the current number of participants",
            ));
        }
        session.max_participants = (max > 0).then_some(max);
    }
    session.updated_at = now;

    storage.collection::<PeerEducationSession>().save(&session)?;
    Ok(view(session, Some(actor)))
}

pub async fn set_status(
    state: &AppState,
    actor: &AuthenticatedUser,
    session_id: &str,
    status: SessionStatus,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    ensure_manager(&session, actor)?;
    session.set_status(status, now)?;
    storage.collection::<PeerEducationSession>().save(&session)?;
    if status == SessionStatus::Cancelled {
        audit_log!(storage, AuditEventType::SessionCancelled, actor, "session", session_id);
    }
    Ok(view(session, Some(actor)))
}

pub async fn cancel(
    state: &AppState,
    actor: &AuthenticatedUser,
    session_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    set_status(state, actor, session_id, SessionStatus::Cancelled, now).await
}

pub async fn get(
    state: &AppState,
    session_id: &str,
    viewer: Option<&AuthenticatedUser>,
) -> ServiceResult<SessionView> {
    let session: PeerEducationSession = load(state.storage(), session_id)?;
    Ok(view(session, viewer))
}

pub async fn list(
    state: &AppState,
    query: SessionListQuery,
    viewer: Option<&AuthenticatedUser>,
    now: DateTime<Utc>,
) -> ServiceResult<Paginated<SessionView>> {
    let mut sessions = state
        .storage()
        .collection::<PeerEducationSession>()
        .find(|s| {
            query.category.is_none_or(|c| s.category == c)
                && query.status.is_none_or(|st| s.status == st)
                && (query.upcoming != Some(true) || s.scheduled_at > now)
                && matches_search(query.search.as_deref(), &[&s.title, &s.topic, &s.description])
        })?;
    sessions.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(sessions, params).map(|s| view(s, viewer)))
}

pub async fn join(
    state: &AppState,
    user: &AuthenticatedUser,
    session_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    session.join(&user.user_id, now)?;
    storage.collection::<PeerEducationSession>().save(&session)?;
    tracing::info!(session_id, user_id = %user.user_id, "Joined session");
    Ok(view(session, Some(user)))
}

pub async fn leave(
    state: &AppState,
    user: &AuthenticatedUser,
    session_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    session.leave(&user.user_id, now)?;
    storage.collection::<PeerEducationSession>().save(&session)?;
    Ok(view(session, Some(user)))
}

pub async fn mark_attendance(
    state: &AppState,
    actor: &AuthenticatedUser,
    session_id: &str,
    user_id: &str,
    attended: bool,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    ensure_manager(&session, actor)?;
    session.mark_attendance(user_id, attended, now)?;
    storage.collection::<PeerEducationSession>().save(&session)?;
    audit_log!(storage, AuditEventType::AttendanceMarked, actor, "session", session_id);
    Ok(view(session, Some(actor)))
}

pub async fn record_scores(
    state: &AppState,
    actor: &AuthenticatedUser,
    session_id: &str,
    user_id: &str,
    req: ScoresRequest,
    now: DateTime<Utc>,
) -> ServiceResult<SessionView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut session: PeerEducationSession = load(storage, session_id)?;
    ensure_manager(&session, actor)?;
    session.record_scores(user_id, req.pre_test_score, req.post_test_score, now)?;
    storage.collection::<PeerEducationSession>().save(&session)?;
    Ok(view(session, Some(actor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;
    use chrono::Duration;

    fn request(now: DateTime<Utc>, max: Option<u32>) -> CreateSessionRequest {
        CreateSessionRequest {
            title: "Safer Partying".into(),
            description: "Harm reduction basics for freshers".into(),
            topic: "Alcohol".into(),
            category: HealthTopic::SubstanceAbuse,
            facilitators: vec![],
            scheduled_at: now + Duration::days(1),
            duration_minutes: 60,
            location: "Room 12".into(),
            max_participants: max,
            materials: vec![],
        }
    }

    #[tokio::test]
    async fn join_respects_capacity_and_hides_participants() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let educator = principal(&state, "pe", &[Role::PeerEducator]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let bob = principal(&state, "bob", &[Role::Member]);

        let session = create(&state, &educator, request(now, Some(1)), now).await.unwrap();
        assert_eq!(session.facilitators, vec![educator.user_id.clone()]);

        let joined = join(&state, &alice, &session.id, now).await.unwrap();
        assert!(joined.joined);
        assert!(joined.participants.is_none());
        assert_eq!(joined.summary.available_spots, Some(0));

        let err = join(&state, &bob, &session.id, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(ref m) if m == "Session is full"));

        let managed = get(&state, &session.id, Some(&educator)).await.unwrap();
        assert_eq!(managed.participants.map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn scores_drive_average_improvement() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let educator = principal(&state, "pe", &[Role::PeerEducator]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let bob = principal(&state, "bob", &[Role::Member]);

        let session = create(&state, &educator, request(now, None), now).await.unwrap();
        join(&state, &alice, &session.id, now).await.unwrap();
        join(&state, &bob, &session.id, now).await.unwrap();

        let scores = |pre, post| ScoresRequest { pre_test_score: Some(pre), post_test_score: Some(post) };
        record_scores(&state, &educator, &session.id, &alice.user_id, scores(40, 80), now).await.unwrap();
        let view = record_scores(&state, &educator, &session.id, &bob.user_id, scores(60, 80), now)
            .await
            .unwrap();
        assert_eq!(view.summary.average_improvement, Some(30.0));

        assert!(matches!(
            record_scores(&state, &alice, &session.id, &alice.user_id, scores(0, 100), now).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_sessions_reject_joins_and_edits() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let educator = principal(&state, "pe", &[Role::PeerEducator]);
        let alice = principal(&state, "alice", &[Role::Member]);

        let session = create(&state, &educator, request(now, None), now).await.unwrap();
        cancel(&state, &educator, &session.id, now).await.unwrap();

        assert!(join(&state, &alice, &session.id, now).await.is_err());
        assert!(update(&state, &educator, &session.id, UpdateSessionRequest::default(), now)
            .await
            .is_err());
        assert!(set_status(&state, &educator, &session.id, SessionStatus::Scheduled, now)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn past_schedule_is_rejected() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let educator = principal(&state, "pe", &[Role::PeerEducator]);
        let mut req = request(now, None);
        req.scheduled_at = now - Duration::hours(1);
        assert!(matches!(
            create(&state, &educator, req, now).await,
            Err(ServiceError::ValidationFailed(_))
        ));
    }
}
