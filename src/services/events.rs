// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Event management and the registration workflow.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{assign, load, matches_search};
use crate::{
    audit_log,
    auth::AuthenticatedUser,
    domain::{
        new_id, Event, EventStatus, EventType, EventView, Feature, HealthTopic, Registration,
    },
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::AuditEventType,
    validation::{Validate, Validator},
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub category: HealthTopic,
    /// Defaults to `published`.
    #[serde(default)]
    pub status: EventStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub registration_required: bool,
    /// Defaults to the creation time.
    pub registration_open_date: Option<DateTime<Utc>>,
    /// Defaults to `start_date`.
    pub registration_close_date: Option<DateTime<Utc>>,
    pub location: String,
    pub capacity: Option<u32>,
    #[serde(default = "default_true")]
    pub allow_cancellation: bool,
    #[serde(default)]
    pub organizers: Vec<String>,
    pub image_url: Option<String>,
}

impl Validate for CreateEventRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.length("description", &self.description, 10, 5000);
        v.length("location", &self.location, 2, 200);
        v.optional_range("capacity", self.capacity, 1, 100_000);
        v.optional_url("image_url", self.image_url.as_deref());
        for organizer in &self.organizers {
            v.uuid("organizers", organizer);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub category: Option<HealthTopic>,
    pub status: Option<EventStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_required: Option<bool>,
    pub registration_open_date: Option<DateTime<Utc>>,
    pub registration_close_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    /// `0` removes the cap.
    pub capacity: Option<u32>,
    pub allow_cancellation: Option<bool>,
    pub organizers: Option<Vec<String>>,
    pub image_url: Option<String>,
}

impl Validate for UpdateEventRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("description", self.description.as_deref(), 10, 5000);
        v.optional_length("location", self.location.as_deref(), 2, 200);
        v.optional_range("capacity", self.capacity, 0, 100_000);
        v.optional_url("image_url", self.image_url.as_deref());
        for organizer in self.organizers.iter().flatten() {
            v.uuid("organizers", organizer);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EventListQuery {
    pub category: Option<HealthTopic>,
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    /// Only events starting after now.
    pub upcoming: Option<bool>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for EventListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    pub attended: bool,
}

impl Validate for AttendanceRequest {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EventFeedbackRequest {
    /// 1-5
    pub rating: u8,
    pub comment: Option<String>,
}

impl Validate for EventFeedbackRequest {
    fn validate(&self, v: &mut Validator) {
        v.range("rating", self.rating, 1, 5);
        v.optional_length("comment", self.comment.as_deref(), 1, 1000);
    }
}

/// Drafts are visible to admins and the event's organizers only.
fn visible_to(event: &Event, viewer: Option<&AuthenticatedUser>) -> bool {
    event.status != EventStatus::Draft
        || viewer.is_some_and(|u| u.is_admin() || event.is_organizer(&u.user_id))
}

/// Admins and organizers manage attendance and see registrations.
fn ensure_manager(event: &Event, actor: &AuthenticatedUser) -> ServiceResult<()> {
    if actor.is_admin() || event.is_organizer(&actor.user_id) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "Only organizers or admins can manage this event",
        ))
    }
}

pub async fn create(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: CreateEventRequest,
    now: DateTime<Utc>,
) -> ServiceResult<EventView> {
    if req.start_date <= now {
        return Err(ServiceError::field("start_date", "start_date must be in the future"));
    }
    let event = Event {
        id: new_id(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        event_type: req.event_type,
        category: req.category,
        status: req.status,
        start_date: req.start_date,
        end_date: req.end_date,
        registration_required: req.registration_required,
        registration_open_date: req.registration_open_date.unwrap_or(now),
        registration_close_date: req.registration_close_date.unwrap_or(req.start_date),
        location: req.location.trim().to_string(),
        capacity: req.capacity,
        allow_cancellation: req.allow_cancellation,
        organizers: req.organizers,
        registrations: Vec::new(),
        image_url: req.image_url,
        created_by: admin.user_id.clone(),
        created_at: now,
        updated_at: now,
    };
    event.check_schedule()?;

    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<Event>().insert(&event)?;
    audit_log!(storage, AuditEventType::EventCreated, admin, "event", &event.id);
    tracing::info!(event_id = %event.id, "Event created");

    Ok(event.view(now, Some(&admin.user_id)))
}

pub async fn update(
    state: &AppState,
    actor: &AuthenticatedUser,
    event_id: &str,
    req: UpdateEventRequest,
    now: DateTime<Utc>,
) -> ServiceResult<EventView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut event: Event = load(storage, event_id)?;
    ensure_manager(&event, actor)?;

    assign(&mut event.title, req.title.map(|t| t.trim().to_string()));
    assign(&mut event.description, req.description.map(|d| d.trim().to_string()));
    assign(&mut event.event_type, req.event_type);
    assign(&mut event.category, req.category);
    assign(&mut event.status, req.status);
    assign(&mut event.start_date, req.start_date);
    assign(&mut event.end_date, req.end_date);
    assign(&mut event.registration_required, req.registration_required);
    assign(&mut event.registration_open_date, req.registration_open_date);
    assign(&mut event.registration_close_date, req.registration_close_date);
    assign(&mut event.location, req.location.map(|l| l.trim().to_string()));
    assign(&mut event.allow_cancellation, req.allow_cancellation);
    assign(&mut event.organizers, req.organizers);
    if let Some(capacity) = req.capacity {
        event.capacity = (capacity > 0).then_some(capacity);
    }
    if req.image_url.is_some() {
        event.image_url = req.image_url;
    }
    event.check_schedule()?;
    event.updated_at = now;

    storage.collection::<Event>().save(&event)?;
    audit_log!(storage, AuditEventType::EventUpdated, actor, "event", &event.id);
    Ok(event.view(now, Some(&actor.user_id)))
}

pub async fn delete(state: &AppState, admin: &AuthenticatedUser, event_id: &str) -> ServiceResult<()> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<Event>().delete(event_id)?;
    audit_log!(storage, AuditEventType::EventDeleted, admin, "event", event_id);
    Ok(())
}

pub async fn get(
    state: &AppState,
    event_id: &str,
    viewer: Option<&AuthenticatedUser>,
    now: DateTime<Utc>,
) -> ServiceResult<EventView> {
    let event: Event = load(state.storage(), event_id)?;
    if !visible_to(&event, viewer) {
        return Err(ServiceError::not_found("Event not found"));
    }
    Ok(event.view(now, viewer.map(|u| u.user_id.as_str())))
}

pub async fn list(
    state: &AppState,
    query: EventListQuery,
    viewer: Option<&AuthenticatedUser>,
    now: DateTime<Utc>,
) -> ServiceResult<Paginated<EventView>> {
    let mut events = state.storage().collection::<Event>().find(|e| {
        visible_to(e, viewer)
            && query.category.is_none_or(|c| e.category == c)
            && query.event_type.is_none_or(|t| e.event_type == t)
            && query.status.is_none_or(|s| e.status == s)
            && (query.upcoming != Some(true) || e.start_date > now)
            && matches_search(query.search.as_deref(), &[&e.title, &e.description, &e.location])
    })?;
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let viewer_id = viewer.map(|u| u.user_id.as_str());
    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(events, params).map(|e| e.view(now, viewer_id)))
}

pub async fn register(
    state: &AppState,
    user: &AuthenticatedUser,
    event_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<EventView> {
    state.settings().await.ensure_enabled(Feature::EventRegistration)?;

    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut event: Event = load(storage, event_id)?;
    if !visible_to(&event, Some(user)) {
        return Err(ServiceError::not_found("Event not found"));
    }
    event.register(&user.user_id, now)?;
    storage.collection::<Event>().save(&event)?;
    tracing::info!(event_id = %event.id, user_id = %user.user_id, "Registered for event");

    Ok(event.view(now, Some(&user.user_id)))
}

pub async fn unregister(
    state: &AppState,
    user: &AuthenticatedUser,
    event_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<EventView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut event: Event = load(storage, event_id)?;
    event.unregister(&user.user_id, now)?;
    storage.collection::<Event>().save(&event)?;
    tracing::info!(event_id = %event.id, user_id = %user.user_id, "Cancelled event registration");

    Ok(event.view(now, Some(&user.user_id)))
}

pub async fn mark_attendance(
    state: &AppState,
    actor: &AuthenticatedUser,
    event_id: &str,
    user_id: &str,
    attended: bool,
    now: DateTime<Utc>,
) -> ServiceResult<Registration> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut event: Event = load(storage, event_id)?;
    ensure_manager(&event, actor)?;
    event.mark_attendance(user_id, attended, now)?;
    storage.collection::<Event>().save(&event)?;
    audit_log!(storage, AuditEventType::AttendanceMarked, actor, "event", &event.id);

    event
        .registration_for(user_id)
        .cloned()
        .ok_or_else(|| ServiceError::not_found("Registration not found"))
}

pub async fn registrations(
    state: &AppState,
    actor: &AuthenticatedUser,
    event_id: &str,
) -> ServiceResult<Vec<Registration>> {
    let event: Event = load(state.storage(), event_id)?;
    ensure_manager(&event, actor)?;
    Ok(event.registrations)
}

pub async fn submit_feedback(
    state: &AppState,
    user: &AuthenticatedUser,
    event_id: &str,
    req: EventFeedbackRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Registration> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut event: Event = load(storage, event_id)?;
    event.submit_feedback(&user.user_id, req.rating, req.comment, now)?;
    storage.collection::<Event>().save(&event)?;

    event
        .registration_for(&user.user_id)
        .cloned()
        .ok_or_else(|| ServiceError::not_found("Registration not found"))
}

/// Events the principal is registered for, soonest first.
pub async fn my_events(
    state: &AppState,
    user: &AuthenticatedUser,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<EventView>> {
    let mut events = state
        .storage()
        .collection::<Event>()
        .find(|e| e.is_registered(&user.user_id))?;
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    Ok(events.iter().map(|e| e.view(now, Some(&user.user_id))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::domain::RegistrationStatus;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;
    use chrono::Duration;

    fn request(now: DateTime<Utc>, capacity: Option<u32>) -> CreateEventRequest {
        CreateEventRequest {
            title: "Flu Shot Clinic".into(),
            description: "Free flu shots for students".into(),
            event_type: EventType::HealthScreening,
            category: HealthTopic::GeneralWellness,
            status: EventStatus::Published,
            start_date: now + Duration::days(2),
            end_date: now + Duration::days(2) + Duration::hours(3),
            registration_required: true,
            registration_open_date: None,
            registration_close_date: Some(now + Duration::days(1)),
            location: "Student Center".into(),
            capacity,
            allow_cancellation: true,
            organizers: vec![],
            image_url: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_registrations_never_exceed_capacity() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let event = create(&state, &admin, request(now, Some(1)), now).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let member = principal(&state, &format!("member{i}"), &[Role::Member]);
            let state = state.clone();
            let event_id = event.id.clone();
            tasks.spawn(async move { register(&state, &member, &event_id, now).await });
        }

        let mut admitted = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(_) => admitted += 1,
                Err(ServiceError::InvalidOperation(message)) => assert_eq!(message, "Event is full"),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(admitted, 1);

        let stored: Event = load(state.storage(), &event.id).unwrap();
        assert_eq!(stored.registrations.len(), 1);
    }

    #[tokio::test]
    async fn past_start_date_is_reported_as_such() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);

        let mut req = request(now, None);
        req.start_date = now - Duration::days(1);
        req.end_date = now - Duration::hours(20);
        req.registration_close_date = None;

        match create(&state, &admin, req, now).await.unwrap_err() {
            ServiceError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "start_date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn capacity_one_event_admits_exactly_one() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let bob = principal(&state, "bob", &[Role::Member]);

        let event = create(&state, &admin, request(now, Some(1)), now).await.unwrap();
        let view = register(&state, &alice, &event.id, now).await.unwrap();
        assert_eq!(view.available_slots, Some(0));
        assert_eq!(view.registration_status, RegistrationStatus::Full);

        let err = register(&state, &bob, &event.id, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(ref m) if m == "Event is full"));

        let stored = get(&state, &event.id, None, now).await.unwrap();
        assert_eq!(stored.registration_count, 1);
    }

    #[tokio::test]
    async fn register_then_unregister_restores_state() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);

        let event = create(&state, &admin, request(now, Some(10)), now).await.unwrap();
        register(&state, &alice, &event.id, now).await.unwrap();
        let after = unregister(&state, &alice, &event.id, now).await.unwrap();

        assert_eq!(after.registration_count, 0);
        assert_eq!(after.available_slots, Some(10));
        assert!(!after.is_registered);
        assert!(my_events(&state, &alice, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_windows_are_rejected_on_create_and_update() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);

        let mut bad = request(now, None);
        bad.end_date = bad.start_date - Duration::hours(1);
        bad.registration_close_date = Some(bad.start_date + Duration::hours(1));
        match create(&state, &admin, bad, now).await.unwrap_err() {
            ServiceError::ValidationFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }

        let event = create(&state, &admin, request(now, None), now).await.unwrap();
        let update_req = UpdateEventRequest {
            registration_open_date: Some(now + Duration::days(1) + Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(
            update(&state, &admin, &event.id, update_req, now).await,
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn attendance_requires_manager() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);

        let event = create(&state, &admin, request(now, None), now).await.unwrap();
        register(&state, &alice, &event.id, now).await.unwrap();

        assert!(matches!(
            mark_attendance(&state, &alice, &event.id, &alice.user_id, true, now).await,
            Err(ServiceError::Forbidden(_))
        ));
        let registration = mark_attendance(&state, &admin, &event.id, &alice.user_id, true, now)
            .await
            .unwrap();
        assert!(registration.attended);

        let feedback = submit_feedback(
            &state,
            &alice,
            &event.id,
            EventFeedbackRequest { rating: 5, comment: None },
            now,
        )
        .await
        .unwrap();
        assert_eq!(feedback.feedback.map(|f| f.rating), Some(5));
    }

    #[tokio::test]
    async fn drafts_hidden_from_members() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);

        let mut req = request(now, None);
        req.status = EventStatus::Draft;
        let draft = create(&state, &admin, req, now).await.unwrap();

        assert!(matches!(get(&state, &draft.id, Some(&alice), now).await, Err(ServiceError::NotFound(_))));
        assert_eq!(list(&state, EventListQuery::default(), Some(&alice), now).await.unwrap().total, 0);
        assert_eq!(list(&state, EventListQuery::default(), Some(&admin), now).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn disabled_feature_blocks_registration() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let event = create(&state, &admin, request(now, None), now).await.unwrap();

        let mut settings = state.settings().await;
        settings.features.event_registration = false;
        state.replace_settings(settings).await.unwrap();

        assert!(matches!(
            register(&state, &alice, &event.id, now).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
