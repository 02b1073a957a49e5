// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource library and training content.
//!
//! Reads are gated by each resource's access level; unpublished items are
//! visible to admins only. Completion records are upserted per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{assign, load, matches_search};
use crate::{
    audit_log,
    auth::{AuthenticatedUser, Role},
    domain::{
        clean_tags, new_id, training_progress, user_completions, AccessLevel, CompletionInput,
        CompletionTracked, HealthTopic, Resource, ResourceType, ResourceView, TrainingContent,
        TrainingContentType, TrainingProgress, TrainingView,
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

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub category: HealthTopic,
    #[serde(default)]
    pub access_level: AccessLevel,
    /// Uploaded file location.
    pub url: Option<String>,
    pub external_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

impl Validate for CreateResourceRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.length("description", &self.description, 10, 5000);
        v.optional_url("url", self.url.as_deref());
        v.optional_url("external_link", self.external_link.as_deref());
        v.check(
            self.url.is_some() || self.external_link.is_some(),
            "url",
            "either url or external_link is required",
        );
        v.check(self.tags.len() <= 20, "tags", "at most 20 tags");
        v.optional_length("author", self.author.as_deref(), 2, 100);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub category: Option<HealthTopic>,
    pub access_level: Option<AccessLevel>,
    pub url: Option<String>,
    pub external_link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub is_published: Option<bool>,
}

impl Validate for UpdateResourceRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("description", self.description.as_deref(), 10, 5000);
        v.optional_url("url", self.url.as_deref());
        v.optional_url("external_link", self.external_link.as_deref());
        if let Some(tags) = &self.tags {
            v.check(tags.len() <= 20, "tags", "at most 20 tags");
        }
        v.optional_length("author", self.author.as_deref(), 2, 100);
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ResourceListQuery {
    pub category: Option<HealthTopic>,
    pub resource_type: Option<ResourceType>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for ResourceListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("tag", self.tag.as_deref(), 1, 50);
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompleteRequest {
    pub time_spent_minutes: Option<u32>,
    pub feedback: Option<String>,
}

impl Validate for CompleteRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_range("time_spent_minutes", self.time_spent_minutes, 0, 10_000);
        v.optional_length("feedback", self.feedback.as_deref(), 1, 1000);
    }
}

impl From<CompleteRequest> for CompletionInput {
    fn from(req: CompleteRequest) -> Self {
        CompletionInput {
            time_spent_minutes: req.time_spent_minutes,
            feedback: req.feedback,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RateRequest {
    /// 1-5
    pub score: u8,
    pub comment: Option<String>,
}

impl Validate for RateRequest {
    fn validate(&self, v: &mut Validator) {
        v.range("score", self.score, 1, 5);
        v.optional_length("comment", self.comment.as_deref(), 1, 1000);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTrainingRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub content_type: TrainingContentType,
    /// Empty targets everyone.
    #[serde(default)]
    pub target_roles: Vec<Role>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub sequence: u32,
    #[serde(default)]
    pub is_required: bool,
    pub url: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

impl Validate for CreateTrainingRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.length("description", &self.description, 10, 5000);
        v.optional_range("duration_minutes", self.duration_minutes, 1, 1440);
        v.range("sequence", self.sequence, 0, 10_000);
        v.url("url", &self.url);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTrainingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<TrainingContentType>,
    pub target_roles: Option<Vec<Role>>,
    pub duration_minutes: Option<u32>,
    pub sequence: Option<u32>,
    pub is_required: Option<bool>,
    pub url: Option<String>,
    pub is_published: Option<bool>,
}

impl Validate for UpdateTrainingRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("description", self.description.as_deref(), 10, 5000);
        v.optional_range("duration_minutes", self.duration_minutes, 1, 1440);
        v.optional_range("sequence", self.sequence, 0, 10_000);
        v.optional_url("url", self.url.as_deref());
    }
}

/// Everything a principal has completed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyCompletions {
    pub resources: Vec<ResourceView>,
    pub training: Vec<TrainingView>,
}

// =============================================================================
// Resources
// =============================================================================

/// Visibility check for one resource. Denied anonymous callers get 401,
/// signed-in callers 403.
fn check_access(resource: &Resource, viewer: Option<&AuthenticatedUser>) -> ServiceResult<()> {
    let admin = viewer.is_some_and(|u| u.is_admin());
    if !resource.is_published && !admin {
        return Err(ServiceError::not_found("Resource not found"));
    }
    if resource.access_level.permits(viewer.map(|u| &u.roles)) {
        return Ok(());
    }
    match viewer {
        None => Err(ServiceError::Unauthenticated(
            "Authentication required to view this resource".to_string(),
        )),
        Some(_) => Err(ServiceError::forbidden(
            "You do not have access to this resource",
        )),
    }
}

pub async fn create_resource(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: CreateResourceRequest,
    now: DateTime<Utc>,
) -> ServiceResult<ResourceView> {
    let resource = Resource {
        id: new_id(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        resource_type: req.resource_type,
        category: req.category,
        access_level: req.access_level,
        url: req.url,
        external_link: req.external_link,
        tags: clean_tags(req.tags),
        author: req.author,
        is_published: req.is_published,
        view_count: 0,
        completions: Vec::new(),
        ratings: Vec::new(),
        created_by: admin.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<Resource>().insert(&resource)?;
    audit_log!(storage, AuditEventType::ResourceCreated, admin, "resource", &resource.id);
    Ok(resource.view(Some(&admin.user_id)))
}

pub async fn update_resource(
    state: &AppState,
    admin: &AuthenticatedUser,
    resource_id: &str,
    req: UpdateResourceRequest,
    now: DateTime<Utc>,
) -> ServiceResult<ResourceView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut resource: Resource = load(storage, resource_id)?;

    assign(&mut resource.title, req.title.map(|t| t.trim().to_string()));
    assign(&mut resource.description, req.description.map(|d| d.trim().to_string()));
    assign(&mut resource.resource_type, req.resource_type);
    assign(&mut resource.category, req.category);
    assign(&mut resource.access_level, req.access_level);
    assign(&mut resource.is_published, req.is_published);
    if req.url.is_some() {
        resource.url = req.url;
    }
    if req.external_link.is_some() {
        resource.external_link = req.external_link;
    }
    if let Some(tags) = req.tags {
        resource.tags = clean_tags(tags);
    }
    if req.author.is_some() {
        resource.author = req.author;
    }
    resource.updated_at = now;

    storage.collection::<Resource>().save(&resource)?;
    Ok(resource.view(Some(&admin.user_id)))
}

pub async fn delete_resource(state: &AppState, admin: &AuthenticatedUser, resource_id: &str) -> ServiceResult<()> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<Resource>().delete(resource_id)?;
    audit_log!(storage, AuditEventType::ResourceDeleted, admin, "resource", resource_id);
    Ok(())
}

/// Resources the viewer may read, newest first.
pub async fn list_resources(
    state: &AppState,
    query: ResourceListQuery,
    viewer: Option<&AuthenticatedUser>,
) -> ServiceResult<Paginated<ResourceView>> {
    let tag = query.tag.as_deref().map(|t| t.trim().to_lowercase());
    let mut resources = state.storage().collection::<Resource>().find(|r| {
        check_access(r, viewer).is_ok()
            && query.category.is_none_or(|c| r.category == c)
            && query.resource_type.is_none_or(|t| r.resource_type == t)
            && tag.as_deref().is_none_or(|t| r.tags.iter().any(|x| x == t))
            && matches_search(query.search.as_deref(), &[&r.title, &r.description])
    })?;
    resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let viewer_id = viewer.map(|u| u.user_id.as_str());
    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(resources, params).map(|r| r.view(viewer_id)))
}

/// Read one resource and count the view.
pub async fn get_resource(
    state: &AppState,
    resource_id: &str,
    viewer: Option<&AuthenticatedUser>,
) -> ServiceResult<ResourceView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut resource: Resource = load(storage, resource_id)?;
    check_access(&resource, viewer)?;
    resource.record_view();
    storage.collection::<Resource>().save(&resource)?;
    Ok(resource.view(viewer.map(|u| u.user_id.as_str())))
}

pub async fn complete_resource(
    state: &AppState,
    user: &AuthenticatedUser,
    resource_id: &str,
    req: CompleteRequest,
    now: DateTime<Utc>,
) -> ServiceResult<ResourceView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut resource: Resource = load(storage, resource_id)?;
    check_access(&resource, Some(user))?;
    resource.mark_completed(&user.user_id, req.into(), now);
    storage.collection::<Resource>().save(&resource)?;
    Ok(resource.view(Some(&user.user_id)))
}

pub async fn rate_resource(
    state: &AppState,
    user: &AuthenticatedUser,
    resource_id: &str,
    req: RateRequest,
    now: DateTime<Utc>,
) -> ServiceResult<ResourceView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut resource: Resource = load(storage, resource_id)?;
    check_access(&resource, Some(user))?;
    resource.rate(&user.user_id, req.score, req.comment, now);
    storage.collection::<Resource>().save(&resource)?;
    Ok(resource.view(Some(&user.user_id)))
}

pub async fn my_completions(state: &AppState, user: &AuthenticatedUser) -> ServiceResult<MyCompletions> {
    let storage = state.storage();
    let resources = storage.collection::<Resource>().list_all()?;
    let training = storage.collection::<TrainingContent>().list_all()?;
    let me = Some(user.user_id.as_str());

    Ok(MyCompletions {
        resources: user_completions(&resources, &user.user_id)
            .into_iter()
            .map(|r| r.view(me))
            .collect(),
        training: user_completions(&training, &user.user_id)
            .into_iter()
            .map(|t| t.view(me))
            .collect(),
    })
}

// =============================================================================
// Training
// =============================================================================

fn check_training(item: &TrainingContent, user: &AuthenticatedUser) -> ServiceResult<()> {
    if user.is_admin() || (item.is_published && item.targets(&user.roles)) {
        Ok(())
    } else {
        Err(ServiceError::not_found("Training content not found"))
    }
}

pub async fn create_training(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: CreateTrainingRequest,
    now: DateTime<Utc>,
) -> ServiceResult<TrainingView> {
    let item = TrainingContent {
        id: new_id(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        content_type: req.content_type,
        target_roles: req.target_roles,
        duration_minutes: req.duration_minutes,
        sequence: req.sequence,
        is_required: req.is_required,
        url: req.url,
        is_published: req.is_published,
        completions: Vec::new(),
        created_by: admin.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<TrainingContent>().insert(&item)?;
    audit_log!(storage, AuditEventType::ResourceCreated, admin, "training", &item.id);
    Ok(item.view(Some(&admin.user_id)))
}

pub async fn update_training(
    state: &AppState,
    admin: &AuthenticatedUser,
    training_id: &str,
    req: UpdateTrainingRequest,
    now: DateTime<Utc>,
) -> ServiceResult<TrainingView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut item: TrainingContent = load(storage, training_id)?;

    assign(&mut item.title, req.title.map(|t| t.trim().to_string()));
    assign(&mut item.description, req.description.map(|d| d.trim().to_string()));
    assign(&mut item.content_type, req.content_type);
    assign(&mut item.target_roles, req.target_roles);
    assign(&mut item.sequence, req.sequence);
    assign(&mut item.is_required, req.is_required);
    assign(&mut item.url, req.url);
    assign(&mut item.is_published, req.is_published);
    if req.duration_minutes.is_some() {
        item.duration_minutes = req.duration_minutes;
    }
    item.updated_at = now;

    storage.collection::<TrainingContent>().save(&item)?;
    Ok(item.view(Some(&admin.user_id)))
}

pub async fn delete_training(state: &AppState, admin: &AuthenticatedUser, training_id: &str) -> ServiceResult<()> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    storage.collection::<TrainingContent>().delete(training_id)?;
    audit_log!(storage, AuditEventType::ResourceDeleted, admin, "training", training_id);
    Ok(())
}

/// Training targeted at the principal's roles, in sequence order.
pub async fn list_training(state: &AppState, user: &AuthenticatedUser) -> ServiceResult<Vec<TrainingView>> {
    let mut items = state
        .storage()
        .collection::<TrainingContent>()
        .find(|t| check_training(t, user).is_ok())?;
    items.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.title.cmp(&b.title)));
    Ok(items.iter().map(|t| t.view(Some(&user.user_id))).collect())
}

pub async fn get_training(state: &AppState, user: &AuthenticatedUser, training_id: &str) -> ServiceResult<TrainingView> {
    let item: TrainingContent = load(state.storage(), training_id)?;
    check_training(&item, user)?;
    Ok(item.view(Some(&user.user_id)))
}

pub async fn complete_training(
    state: &AppState,
    user: &AuthenticatedUser,
    training_id: &str,
    req: CompleteRequest,
    now: DateTime<Utc>,
) -> ServiceResult<TrainingView> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let mut item: TrainingContent = load(storage, training_id)?;
    check_training(&item, user)?;
    item.mark_completed(&user.user_id, req.into(), now);
    storage.collection::<TrainingContent>().save(&item)?;
    Ok(item.view(Some(&user.user_id)))
}

pub async fn progress(state: &AppState, user: &AuthenticatedUser) -> ServiceResult<TrainingProgress> {
    let items = state.storage().collection::<TrainingContent>().list_all()?;
    Ok(training_progress(&items, &user.user_id, &user.roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    fn resource_req(access_level: AccessLevel) -> CreateResourceRequest {
        CreateResourceRequest {
            title: "Sleep hygiene".into(),
            description: "Ten habits for better sleep".into(),
            resource_type: ResourceType::Article,
            category: HealthTopic::GeneralWellness,
            access_level,
            url: None,
            external_link: Some("https://example.org/sleep".into()),
            tags: vec!["Sleep".into()],
            author: None,
            is_published: true,
        }
    }

    fn training_req(sequence: u32, is_required: bool, target_roles: Vec<Role>) -> CreateTrainingRequest {
        CreateTrainingRequest {
            title: format!("Module {sequence}"),
            description: "Peer educator onboarding".into(),
            content_type: TrainingContentType::Module,
            target_roles,
            duration_minutes: Some(30),
            sequence,
            is_required,
            url: "https://example.org/training".into(),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn access_levels_gate_reads() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let now = Utc::now();

        let members_only = create_resource(&state, &admin, resource_req(AccessLevel::Members), now)
            .await
            .unwrap();
        let peer_only = create_resource(&state, &admin, resource_req(AccessLevel::PeerEducators), now)
            .await
            .unwrap();

        assert!(matches!(
            get_resource(&state, &members_only.id, None).await,
            Err(ServiceError::Unauthenticated(_))
        ));
        let read = get_resource(&state, &members_only.id, Some(&alice)).await.unwrap();
        assert_eq!(read.view_count, 1);
        assert!(matches!(
            get_resource(&state, &peer_only.id, Some(&alice)).await,
            Err(ServiceError::Forbidden(_))
        ));

        let listed = list_resources(&state, ResourceListQuery::default(), Some(&alice)).await.unwrap();
        assert_eq!(listed.total, 1);
        let anonymous = list_resources(&state, ResourceListQuery::default(), None).await.unwrap();
        assert_eq!(anonymous.total, 0);
    }

    #[tokio::test]
    async fn completion_is_upserted_per_user() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let now = Utc::now();
        let resource = create_resource(&state, &admin, resource_req(AccessLevel::Public), now)
            .await
            .unwrap();

        let first = CompleteRequest { time_spent_minutes: Some(5), feedback: None };
        complete_resource(&state, &alice, &resource.id, first, now).await.unwrap();
        let again = CompleteRequest { time_spent_minutes: Some(12), feedback: Some("useful".into()) };
        let view = complete_resource(&state, &alice, &resource.id, again, now).await.unwrap();
        assert_eq!(view.completion_count, 1);
        assert!(view.completed);

        let stored: Resource = load(state.storage(), &resource.id).unwrap();
        assert_eq!(stored.completion_for(&alice.user_id).and_then(|c| c.time_spent_minutes), Some(12));

        let mine = my_completions(&state, &alice).await.unwrap();
        assert_eq!(mine.resources.len(), 1);
        assert!(mine.training.is_empty());
    }

    #[tokio::test]
    async fn rating_again_replaces_score() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let bob = principal(&state, "bob", &[Role::Member]);
        let now = Utc::now();
        let resource = create_resource(&state, &admin, resource_req(AccessLevel::Public), now)
            .await
            .unwrap();

        rate_resource(&state, &alice, &resource.id, RateRequest { score: 2, comment: None }, now).await.unwrap();
        rate_resource(&state, &alice, &resource.id, RateRequest { score: 4, comment: None }, now).await.unwrap();
        let view = rate_resource(&state, &bob, &resource.id, RateRequest { score: 5, comment: None }, now)
            .await
            .unwrap();
        assert_eq!(view.rating_count, 2);
        assert_eq!(view.average_rating, Some(4.5));
    }

    #[tokio::test]
    async fn training_is_targeted_and_tracked() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let educator = principal(&state, "pe", &[Role::PeerEducator]);
        let alice = principal(&state, "alice", &[Role::Member]);
        let now = Utc::now();

        let second = create_training(&state, &admin, training_req(2, true, vec![Role::PeerEducator]), now)
            .await
            .unwrap();
        create_training(&state, &admin, training_req(1, true, vec![Role::PeerEducator]), now)
            .await
            .unwrap();

        let listed = list_training(&state, &educator).await.unwrap();
        assert_eq!(listed.iter().map(|t| t.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert!(list_training(&state, &alice).await.unwrap().is_empty());
        assert!(matches!(
            complete_training(&state, &alice, &second.id, CompleteRequest::default(), now).await,
            Err(ServiceError::NotFound(_))
        ));

        complete_training(&state, &educator, &second.id, CompleteRequest::default(), now)
            .await
            .unwrap();
        let summary = progress(&state, &educator).await.unwrap();
        assert_eq!(summary.required_total, 2);
        assert_eq!(summary.required_completed, 1);
        assert_eq!(summary.percent_required, 50.0);
    }
}
