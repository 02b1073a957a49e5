// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Advisor and peer-educator profiles.
//!
//! Creating a profile grants the matching role on the account; deleting it
//! revokes the role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{AuthenticatedUser, Role},
    domain::{clean_tags, new_id, Advisor, PeerEducator, PeerEducatorStatus, UserProfile},
    error::ServiceResult,
    state::AppState,
    storage::{AuditEventType, ProfileRepository, UserRepository},
    validation::{Validate, Validator},
};

/// Profile joined with its account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WithUser<T> {
    pub profile: T,
    pub user: Option<UserProfile>,
}

fn with_users<T>(state: &AppState, profiles: Vec<T>, user_id: impl Fn(&T) -> &str) -> Vec<WithUser<T>> {
    let users = UserRepository::new(state.storage());
    profiles
        .into_iter()
        .map(|profile| {
            let user = users.get(user_id(&profile)).ok().map(|u| u.profile());
            WithUser { profile, user }
        })
        .collect()
}

/// Add or remove `role` on an account under the write gate.
fn set_role(state: &AppState, user_id: &str, role: Role, granted: bool, now: DateTime<Utc>) -> ServiceResult<()> {
    let users = UserRepository::new(state.storage());
    let mut user = users.get(user_id)?;
    let mut roles = user.role_set();
    if granted {
        roles.insert(role);
    } else {
        roles.remove(role);
        if roles.is_empty() {
            roles.insert(Role::Member);
        }
    }
    user.role = None;
    user.roles = roles.to_vec();
    user.updated_at = now;
    users.update(&mut user)?;
    Ok(())
}

// =============================================================================
// Advisors
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAdvisorRequest {
    pub user_id: String,
    pub title: String,
    pub department: String,
    pub specialization: String,
    pub office_hours: Option<String>,
    pub bio: Option<String>,
}

impl Validate for CreateAdvisorRequest {
    fn validate(&self, v: &mut Validator) {
        v.uuid("user_id", &self.user_id);
        v.length("title", &self.title, 2, 100);
        v.length("department", &self.department, 2, 100);
        v.length("specialization", &self.specialization, 2, 200);
        v.optional_length("office_hours", self.office_hours.as_deref(), 1, 200);
        v.optional_length("bio", self.bio.as_deref(), 1, 2000);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAdvisorRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub office_hours: Option<String>,
    pub bio: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateAdvisorRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 2, 100);
        v.optional_length("department", self.department.as_deref(), 2, 100);
        v.optional_length("specialization", self.specialization.as_deref(), 2, 200);
        v.optional_length("office_hours", self.office_hours.as_deref(), 1, 200);
        v.optional_length("bio", self.bio.as_deref(), 1, 2000);
    }
}

pub async fn create_advisor(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: CreateAdvisorRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Advisor> {
    let advisor = Advisor {
        id: new_id(),
        user_id: req.user_id,
        title: req.title.trim().to_string(),
        department: req.department.trim().to_string(),
        specialization: req.specialization.trim().to_string(),
        office_hours: req.office_hours,
        bio: req.bio,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let storage = state.storage();
    let _gate = state.exclusive().await;
    UserRepository::new(storage).get(&advisor.user_id)?;
    ProfileRepository::<Advisor>::new(storage).create(&advisor)?;
    set_role(state, &advisor.user_id, Role::Advisor, true, now)?;
    audit_log!(storage, AuditEventType::RolesChanged, admin, "user", &advisor.user_id);

    Ok(advisor)
}

pub async fn update_advisor(
    state: &AppState,
    advisor_id: &str,
    req: UpdateAdvisorRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Advisor> {
    let _gate = state.exclusive().await;
    let repo = ProfileRepository::<Advisor>::new(state.storage());
    let mut advisor = repo.get(advisor_id)?;
    super::assign(&mut advisor.title, req.title);
    super::assign(&mut advisor.department, req.department);
    super::assign(&mut advisor.specialization, req.specialization);
    super::assign(&mut advisor.is_active, req.is_active);
    if req.office_hours.is_some() {
        advisor.office_hours = req.office_hours;
    }
    if req.bio.is_some() {
        advisor.bio = req.bio;
    }
    advisor.updated_at = now;
    repo.update(&advisor)?;
    Ok(advisor)
}

pub async fn delete_advisor(
    state: &AppState,
    admin: &AuthenticatedUser,
    advisor_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let repo = ProfileRepository::<Advisor>::new(storage);
    let advisor = repo.get(advisor_id)?;
    repo.delete(advisor_id)?;
    if let Err(e) = set_role(state, &advisor.user_id, Role::Advisor, false, now) {
        tracing::warn!(error = %e, user_id = %advisor.user_id, "Could not revoke advisor role");
    }
    audit_log!(storage, AuditEventType::RolesChanged, admin, "user", &advisor.user_id);
    Ok(())
}

/// Active advisors for the public directory; `include_inactive` for admins.
pub async fn list_advisors(state: &AppState, include_inactive: bool) -> ServiceResult<Vec<WithUser<Advisor>>> {
    let mut advisors: Vec<_> = ProfileRepository::<Advisor>::new(state.storage())
        .list_all()?
        .into_iter()
        .filter(|a| include_inactive || a.is_active)
        .collect();
    advisors.sort_by(|a, b| a.department.cmp(&b.department).then(a.title.cmp(&b.title)));
    Ok(with_users(state, advisors, |a| &a.user_id))
}

pub async fn get_advisor(state: &AppState, advisor_id: &str) -> ServiceResult<WithUser<Advisor>> {
    let advisor = ProfileRepository::<Advisor>::new(state.storage()).get(advisor_id)?;
    let mut joined = with_users(state, vec![advisor], |a| &a.user_id);
    Ok(joined.remove(0))
}

// =============================================================================
// Peer educators
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePeerEducatorRequest {
    pub user_id: String,
    #[serde(default)]
    pub status: PeerEducatorStatus,
    #[serde(default)]
    pub specializations: Vec<String>,
    pub bio: Option<String>,
}

impl Validate for CreatePeerEducatorRequest {
    fn validate(&self, v: &mut Validator) {
        v.uuid("user_id", &self.user_id);
        v.check(self.specializations.len() <= 20, "specializations", "at most 20 specializations");
        v.optional_length("bio", self.bio.as_deref(), 1, 2000);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePeerEducatorRequest {
    pub status: Option<PeerEducatorStatus>,
    pub specializations: Option<Vec<String>>,
    pub bio: Option<String>,
}

impl Validate for UpdatePeerEducatorRequest {
    fn validate(&self, v: &mut Validator) {
        if let Some(specializations) = &self.specializations {
            v.check(specializations.len() <= 20, "specializations", "at most 20 specializations");
        }
        v.optional_length("bio", self.bio.as_deref(), 1, 2000);
    }
}

pub async fn create_peer_educator(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: CreatePeerEducatorRequest,
    now: DateTime<Utc>,
) -> ServiceResult<PeerEducator> {
    let mut educator = PeerEducator {
        id: new_id(),
        user_id: req.user_id,
        status: PeerEducatorStatus::Trainee,
        specializations: clean_tags(req.specializations),
        certification_date: None,
        bio: req.bio,
        created_at: now,
        updated_at: now,
    };
    educator.set_status(req.status, now);

    let storage = state.storage();
    let _gate = state.exclusive().await;
    UserRepository::new(storage).get(&educator.user_id)?;
    ProfileRepository::<PeerEducator>::new(storage).create(&educator)?;
    set_role(state, &educator.user_id, Role::PeerEducator, true, now)?;
    audit_log!(storage, AuditEventType::RolesChanged, admin, "user", &educator.user_id);

    Ok(educator)
}

pub async fn update_peer_educator(
    state: &AppState,
    educator_id: &str,
    req: UpdatePeerEducatorRequest,
    now: DateTime<Utc>,
) -> ServiceResult<PeerEducator> {
    let _gate = state.exclusive().await;
    let repo = ProfileRepository::<PeerEducator>::new(state.storage());
    let mut educator = repo.get(educator_id)?;
    if let Some(status) = req.status {
        educator.set_status(status, now);
    }
    if let Some(specializations) = req.specializations {
        educator.specializations = clean_tags(specializations);
    }
    if req.bio.is_some() {
        educator.bio = req.bio;
    }
    educator.updated_at = now;
    repo.update(&educator)?;
    Ok(educator)
}

pub async fn delete_peer_educator(
    state: &AppState,
    admin: &AuthenticatedUser,
    educator_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let repo = ProfileRepository::<PeerEducator>::new(storage);
    let educator = repo.get(educator_id)?;
    repo.delete(educator_id)?;
    if let Err(e) = set_role(state, &educator.user_id, Role::PeerEducator, false, now) {
        tracing::warn!(error = %e, user_id = %educator.user_id, "Could not revoke peer educator role");
    }
    audit_log!(storage, AuditEventType::RolesChanged, admin, "user", &educator.user_id);
    Ok(())
}

/// Certified peer educators; `include_all` for admins.
pub async fn list_peer_educators(state: &AppState, include_all: bool) -> ServiceResult<Vec<WithUser<PeerEducator>>> {
    let mut educators: Vec<_> = ProfileRepository::<PeerEducator>::new(state.storage())
        .list_all()?
        .into_iter()
        .filter(|p| include_all || p.status == PeerEducatorStatus::Certified)
        .collect();
    educators.sort_by(|a, b| b.certification_date.cmp(&a.certification_date));
    Ok(with_users(state, educators, |p| &p.user_id))
}

pub async fn get_peer_educator(state: &AppState, educator_id: &str) -> ServiceResult<WithUser<PeerEducator>> {
    let educator = ProfileRepository::<PeerEducator>::new(state.storage()).get(educator_id)?;
    let mut joined = with_users(state, vec![educator], |p| &p.user_id);
    Ok(joined.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn advisor_profile_grants_and_revokes_role() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let dr = principal(&state, "dr_smith", &[Role::Member]);

        let advisor = create_advisor(
            &state,
            &admin,
            CreateAdvisorRequest {
                user_id: dr.user_id.clone(),
                title: "Dr.".into(),
                department: "Public Health".into(),
                specialization: "Epidemiology".into(),
                office_hours: None,
                bio: None,
            },
            now,
        )
        .await
        .unwrap();

        let user = UserRepository::new(state.storage()).get(&dr.user_id).unwrap();
        assert!(user.role_set().contains(Role::Advisor));

        let listed = list_advisors(&state, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user.as_ref().map(|u| u.id.as_str()), Some(dr.user_id.as_str()));

        update_advisor(&state, &advisor.id, UpdateAdvisorRequest { is_active: Some(false), ..Default::default() }, now)
            .await
            .unwrap();
        assert!(list_advisors(&state, false).await.unwrap().is_empty());
        assert_eq!(list_advisors(&state, true).await.unwrap().len(), 1);

        delete_advisor(&state, &admin, &advisor.id, now).await.unwrap();
        let user = UserRepository::new(state.storage()).get(&dr.user_id).unwrap();
        assert!(!user.role_set().contains(Role::Advisor));
        assert!(user.role_set().contains(Role::Member));
    }

    #[tokio::test]
    async fn only_certified_educators_are_public() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let pat = principal(&state, "pat", &[Role::Member]);

        let educator = create_peer_educator(
            &state,
            &admin,
            CreatePeerEducatorRequest {
                user_id: pat.user_id.clone(),
                status: PeerEducatorStatus::Trainee,
                specializations: vec!["Nutrition".into()],
                bio: None,
            },
            now,
        )
        .await
        .unwrap();
        assert!(list_peer_educators(&state, false).await.unwrap().is_empty());

        let certified = update_peer_educator(
            &state,
            &educator.id,
            UpdatePeerEducatorRequest { status: Some(PeerEducatorStatus::Certified), ..Default::default() },
            now,
        )
        .await
        .unwrap();
        assert_eq!(certified.certification_date, Some(now));
        assert_eq!(list_peer_educators(&state, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_for_unknown_user_is_not_found() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let result = create_peer_educator(
            &state,
            &admin,
            CreatePeerEducatorRequest {
                user_id: new_id(),
                status: PeerEducatorStatus::Trainee,
                specializations: vec![],
                bio: None,
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
