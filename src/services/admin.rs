// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Admin Service
//!
//! Back-office aggregation and account administration:
//!
//! - Dashboard counters, computed in parallel on the blocking pool
//! - Reports grouped by one dimension
//! - User administration (roles, activation, deletion)
//! - Audit log queries
//! - Superadmin seeding at startup

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{matches_search, record};
use crate::{
    audit_log,
    auth::{AuthenticatedUser, Role, RoleSet},
    domain::{
        normalize_email, AnonymousQuestion, Event, EventStatus, Feedback, FeedbackStatus, Gallery,
        Member, ModerationStatus, PeerEducationSession, QuestionStatus, Resource, Story, User,
        UserProfile,
    },
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, AuditRepository, Document, DocumentStorage, MemberRepository,
        StorageResult, UserRepository,
    },
    validation::{Validate, Validator},
};

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_members: usize,
    pub total_events: usize,
    pub upcoming_events: usize,
    pub total_sessions: usize,
    pub total_stories: usize,
    pub pending_stories: usize,
    pub pending_galleries: usize,
    pub total_resources: usize,
    pub pending_questions: usize,
    pub new_feedback: usize,
    pub generated_at: DateTime<Utc>,
}

/// Count matching documents on the blocking pool.
async fn count<T, F>(storage: &DocumentStorage, predicate: F) -> ServiceResult<usize>
where
    T: Document + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    let storage = storage.clone();
    let counted: StorageResult<usize> =
        tokio::task::spawn_blocking(move || storage.collection::<T>().count(predicate))
            .await
            .map_err(|e| ServiceError::Unexpected(format!("count task failed: {e}")))?;
    Ok(counted?)
}

pub async fn dashboard(state: &AppState, admin: &AuthenticatedUser, now: DateTime<Utc>) -> ServiceResult<DashboardStats> {
    let storage = state.storage();
    let (
        total_users,
        active_users,
        total_members,
        total_events,
        upcoming_events,
        total_sessions,
        total_stories,
        pending_stories,
        pending_galleries,
        total_resources,
        pending_questions,
        new_feedback,
    ) = tokio::try_join!(
        count::<User, _>(storage, |_| true),
        count::<User, _>(storage, |u| u.is_active),
        count::<Member, _>(storage, |_| true),
        count::<Event, _>(storage, |_| true),
        count::<Event, _>(storage, move |e| e.status == EventStatus::Published && e.start_date > now),
        count::<PeerEducationSession, _>(storage, |_| true),
        count::<Story, _>(storage, |_| true),
        count::<Story, _>(storage, |s| s.status == ModerationStatus::PendingReview),
        count::<Gallery, _>(storage, |g| g.status == ModerationStatus::PendingReview),
        count::<Resource, _>(storage, |_| true),
        count::<AnonymousQuestion, _>(storage, |q| q.status == QuestionStatus::Pending),
        count::<Feedback, _>(storage, |f| f.status == FeedbackStatus::New),
    )?;

    audit_log!(storage, AuditEventType::AdminAccess, admin);

    Ok(DashboardStats {
        total_users,
        active_users,
        total_members,
        total_events,
        upcoming_events,
        total_sessions,
        total_stories,
        pending_stories,
        pending_galleries,
        total_resources,
        pending_questions,
        new_feedback,
        generated_at: now,
    })
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    UsersByRole,
    MembersByDepartment,
    EventsByCategory,
    ResourcesByCategory,
    StoriesByStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportRow {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Report {
    pub kind: ReportKind,
    pub rows: Vec<ReportRow>,
    pub total: usize,
}

/// Serialized name of a unit enum variant.
fn variant_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => "unknown".to_string(),
    }
}

fn tally<I: IntoIterator<Item = String>>(kind: ReportKind, keys: I, total: usize) -> Report {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut rows: Vec<ReportRow> = counts.into_iter().map(|(key, count)| ReportRow { key, count }).collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    Report { kind, rows, total }
}

pub async fn report(state: &AppState, admin: &AuthenticatedUser, kind: ReportKind) -> ServiceResult<Report> {
    let storage = state.storage();
    let report = match kind {
        ReportKind::UsersByRole => {
            // A user holding several roles is counted once per role.
            let users = storage.collection::<User>().list_all()?;
            let total = users.len();
            let roles = users
                .iter()
                .flat_map(|u| u.role_set().to_vec())
                .map(|r| r.as_str().to_string());
            tally(kind, roles, total)
        }
        ReportKind::MembersByDepartment => {
            let members = storage.collection::<Member>().list_all()?;
            let total = members.len();
            tally(kind, members.into_iter().map(|m| m.department), total)
        }
        ReportKind::EventsByCategory => {
            let events = storage.collection::<Event>().list_all()?;
            let total = events.len();
            tally(kind, events.iter().map(|e| e.category.as_str().to_string()), total)
        }
        ReportKind::ResourcesByCategory => {
            let resources = storage.collection::<Resource>().list_all()?;
            let total = resources.len();
            tally(kind, resources.iter().map(|r| r.category.as_str().to_string()), total)
        }
        ReportKind::StoriesByStatus => {
            let stories = storage.collection::<Story>().list_all()?;
            let total = stories.len();
            tally(kind, stories.iter().map(|s| variant_name(&s.status)), total)
        }
    };

    audit_log!(storage, AuditEventType::AdminAccess, admin);
    Ok(report)
}

// =============================================================================
// User administration
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Matches username, email and name.
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for UserListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetRolesRequest {
    pub roles: Vec<Role>,
}

impl Validate for SetRolesRequest {
    fn validate(&self, v: &mut Validator) {
        v.check(!self.roles.is_empty(), "roles", "at least one role is required");
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

impl Validate for SetActiveRequest {
    fn validate(&self, _v: &mut Validator) {}
}

pub async fn list_users(state: &AppState, query: UserListQuery) -> ServiceResult<Paginated<UserProfile>> {
    let mut users = state.storage().collection::<User>().find(|u| {
        let name = u.full_name();
        query.role.is_none_or(|r| u.role_set().contains(r))
            && query.is_active.is_none_or(|a| u.is_active == a)
            && matches_search(query.search.as_deref(), &[&u.username, &u.email, &name])
    })?;
    users.sort_by_key(|u| std::cmp::Reverse(u.created_at));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(users, params).map(|u| u.profile()))
}

pub async fn get_user(state: &AppState, user_id: &str) -> ServiceResult<UserProfile> {
    Ok(UserRepository::new(state.storage()).get(user_id)?.profile())
}

/// Only a superadmin may touch a privileged account or grant a privileged role.
fn ensure_may_manage(actor: &AuthenticatedUser, target: &RoleSet) -> ServiceResult<()> {
    if target.iter().any(Role::is_privileged) && !actor.roles.contains(Role::Superadmin) {
        return Err(ServiceError::forbidden(
            "Only a superadmin can manage admin accounts",
        ));
    }
    Ok(())
}

pub async fn set_roles(
    state: &AppState,
    actor: &AuthenticatedUser,
    user_id: &str,
    req: SetRolesRequest,
    now: DateTime<Utc>,
) -> ServiceResult<UserProfile> {
    let requested = RoleSet::from_roles(req.roles);

    let (before, profile) = {
        let _gate = state.exclusive().await;
        let users = UserRepository::new(state.storage());
        let mut user = users.get(user_id)?;
        let before = user.role_set();

        ensure_may_manage(actor, &before)?;
        ensure_may_manage(actor, &requested)?;
        if user.id == actor.user_id && before.contains(Role::Superadmin) && !requested.contains(Role::Superadmin) {
            return Err(ServiceError::invalid("You cannot remove your own superadmin role"));
        }

        user.role = None;
        user.roles = requested.to_vec();
        user.updated_at = now;
        users.update(&mut user)?;
        (before, user.profile())
    };

    record(
        state.storage(),
        AuditEvent::new(AuditEventType::RolesChanged)
            .with_user(&actor.user_id)
            .with_resource("user", user_id)
            .with_details(serde_json::json!({
                "before": before.to_vec(),
                "after": profile.roles.to_vec(),
            })),
    );
    tracing::info!(actor = %actor.user_id, user_id = %user_id, "Roles changed");
    Ok(profile)
}

pub async fn set_active(
    state: &AppState,
    actor: &AuthenticatedUser,
    user_id: &str,
    is_active: bool,
    now: DateTime<Utc>,
) -> ServiceResult<UserProfile> {
    if user_id == actor.user_id && !is_active {
        return Err(ServiceError::invalid("You cannot deactivate your own account"));
    }

    let profile = {
        let _gate = state.exclusive().await;
        let users = UserRepository::new(state.storage());
        let mut user = users.get(user_id)?;
        ensure_may_manage(actor, &user.role_set())?;
        user.is_active = is_active;
        if is_active {
            user.failed_login_attempts = 0;
            user.locked_until = None;
        }
        user.updated_at = now;
        users.update(&mut user)?;
        user.profile()
    };

    record(
        state.storage(),
        AuditEvent::new(AuditEventType::AccountStatusChanged)
            .with_user(&actor.user_id)
            .with_resource("user", user_id)
            .with_details(serde_json::json!({ "is_active": is_active })),
    );
    Ok(profile)
}

/// Removes the account and its member profile.
pub async fn delete_user(state: &AppState, actor: &AuthenticatedUser, user_id: &str) -> ServiceResult<()> {
    if user_id == actor.user_id {
        return Err(ServiceError::invalid("You cannot delete your own account"));
    }

    {
        let _gate = state.exclusive().await;
        let users = UserRepository::new(state.storage());
        let user = users.get(user_id)?;
        ensure_may_manage(actor, &user.role_set())?;

        let members = MemberRepository::new(state.storage());
        if let Some(member) = members.find_by_user(user_id)? {
            members.delete(&member.id)?;
        }
        users.delete(user_id)?;
    }

    audit_log!(state.storage(), AuditEventType::UserDeleted, actor, "user", user_id);
    tracing::info!(actor = %actor.user_id, user_id = %user_id, "User deleted");
    Ok(())
}

/// Grant superadmin to the account registered under `email`.
///
/// Returns false when no such account exists yet.
pub async fn ensure_superadmin(state: &AppState, email: &str, now: DateTime<Utc>) -> ServiceResult<bool> {
    let _gate = state.exclusive().await;
    let users = UserRepository::new(state.storage());
    let Some(mut user) = users.find_by_email(&normalize_email(email))? else {
        return Ok(false);
    };

    let mut roles = user.role_set();
    if roles.insert(Role::Superadmin) || user.role.is_some() {
        user.role = None;
        user.roles = roles.to_vec();
        user.updated_at = now;
        users.update(&mut user)?;
        tracing::info!(user_id = %user.id, "Superadmin role granted");
    }
    Ok(true)
}

// =============================================================================
// Audit log
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// YYYY-MM-DD, defaults to today.
    pub start_date: Option<NaiveDate>,
    /// YYYY-MM-DD, defaults to today.
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub event_type: Option<AuditEventType>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    /// Maximum number of results (default 100).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Longest range accepted in one audit query.
const MAX_AUDIT_RANGE_DAYS: i64 = 366;

impl Validate for AuditQuery {
    fn validate(&self, v: &mut Validator) {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            v.check(start <= end, "end_date", "end_date must not be before start_date");
            v.check(
                (end - start).num_days() <= MAX_AUDIT_RANGE_DAYS,
                "end_date",
                "range must not exceed one year",
            );
        }
        v.optional_range("limit", self.limit, 1, 1000);
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    /// Count before limit/offset.
    pub total: usize,
    pub has_more: bool,
}

pub async fn query_audit(
    state: &AppState,
    admin: &AuthenticatedUser,
    query: AuditQuery,
    now: DateTime<Utc>,
) -> ServiceResult<AuditLogResponse> {
    let today = now.date_naive();
    let start = query.start_date.unwrap_or(today);
    let end = query.end_date.unwrap_or(today).max(start);

    let mut events = AuditRepository::new(state.storage()).read_events_range(start, end)?;
    events.retain(|e| {
        query.user_id.as_deref().is_none_or(|id| e.user_id.as_deref() == Some(id))
            && query.event_type.is_none_or(|t| e.event_type == t)
            && query
                .resource_type
                .as_deref()
                .is_none_or(|t| e.resource_type.as_deref() == Some(t))
            && query
                .resource_id
                .as_deref()
                .is_none_or(|id| e.resource_id.as_deref() == Some(id))
    });

    let total = events.len();
    let limit = query.limit.unwrap_or(100);
    let offset = query.offset.unwrap_or(0);
    let has_more = offset + limit < total;
    let events = events.into_iter().skip(offset).take(limit).collect();

    audit_log!(state.storage(), AuditEventType::AdminAccess, admin);

    Ok(AuditLogResponse {
        events,
        total,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn dashboard_counts_users() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        principal(&state, "member", &[Role::Member]);

        let stats = dashboard(&state, &admin, Utc::now()).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.pending_questions, 0);
    }

    #[tokio::test]
    async fn users_by_role_counts_each_role() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin, Role::Member]);
        principal(&state, "member", &[Role::Member]);

        let report = report(&state, &admin, ReportKind::UsersByRole).await.unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.rows[0].key, "member");
        assert_eq!(report.rows[0].count, 2);
        assert_eq!(report.rows[1].key, "admin");
    }

    #[tokio::test]
    async fn only_superadmin_grants_admin() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let superadmin = principal(&state, "root", &[Role::Superadmin]);
        let member = principal(&state, "member", &[Role::Member]);

        let promote = || SetRolesRequest { roles: vec![Role::Admin, Role::Member] };
        assert!(matches!(
            set_roles(&state, &admin, &member.user_id, promote(), now).await,
            Err(ServiceError::Forbidden(_))
        ));

        let profile = set_roles(&state, &superadmin, &member.user_id, promote(), now).await.unwrap();
        assert!(profile.roles.contains(Role::Admin));

        let moderator = SetRolesRequest { roles: vec![Role::Moderator] };
        assert!(matches!(
            set_roles(&state, &admin, &member.user_id, moderator, now).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn admins_cannot_delete_or_deactivate_themselves() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let member = principal(&state, "member", &[Role::Member]);

        assert!(set_active(&state, &admin, &admin.user_id, false, now).await.is_err());
        assert!(delete_user(&state, &admin, &admin.user_id).await.is_err());

        let profile = set_active(&state, &admin, &member.user_id, false, now).await.unwrap();
        assert!(!profile.is_active);
        delete_user(&state, &admin, &member.user_id).await.unwrap();
        assert!(matches!(
            get_user(&state, &member.user_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seeding_grants_superadmin_once() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let user = principal(&state, "founder", &[Role::Member]);

        assert!(!ensure_superadmin(&state, "nobody@uni.edu", now).await.unwrap());
        assert!(ensure_superadmin(&state, "FOUNDER@uni.edu", now).await.unwrap());
        let profile = get_user(&state, &user.user_id).await.unwrap();
        assert!(profile.roles.contains(Role::Superadmin));
        assert!(profile.roles.contains(Role::Member));
    }

    #[tokio::test]
    async fn audit_query_filters_by_type() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let superadmin = principal(&state, "root", &[Role::Superadmin]);
        let member = principal(&state, "member", &[Role::Member]);

        let req = SetRolesRequest { roles: vec![Role::Moderator] };
        set_roles(&state, &superadmin, &member.user_id, req, now).await.unwrap();

        let query = AuditQuery { event_type: Some(AuditEventType::RolesChanged), ..Default::default() };
        let log = query_audit(&state, &superadmin, query, Utc::now()).await.unwrap();
        assert_eq!(log.total, 1);
        assert_eq!(log.events[0].resource_id.as_deref(), Some(member.user_id.as_str()));
    }
}
