// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Member profiles, attendance history and volunteer hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::matches_search;
use crate::{
    audit_log,
    auth::AuthenticatedUser,
    domain::{
        new_id, clean_tags, EmergencyContact, Event, Member, MembershipStatus,
        PeerEducationSession, UserProfile,
    },
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::{AuditEventType, MemberRepository, UserRepository},
    validation::{Validate, Validator},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MemberProfileRequest {
    pub student_id: String,
    pub department: String,
    pub year_of_study: u8,
    #[serde(default)]
    pub interests: Vec<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

fn validate_contact(v: &mut Validator, contact: Option<&EmergencyContact>) {
    if let Some(contact) = contact {
        v.length("emergency_contact.name", &contact.name, 2, 100);
        v.length("emergency_contact.phone", &contact.phone, 5, 30);
    }
}

impl Validate for MemberProfileRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("student_id", &self.student_id, 3, 30);
        v.length("department", &self.department, 2, 100);
        v.range("year_of_study", self.year_of_study, 1, 10);
        v.check(self.interests.len() <= 20, "interests", "at most 20 interests");
        validate_contact(v, self.emergency_contact.as_ref());
    }
}

impl MemberProfileRequest {
    pub(crate) fn into_member(self, user_id: &str, now: DateTime<Utc>) -> Member {
        Member {
            id: new_id(),
            user_id: user_id.to_string(),
            student_id: self.student_id.trim().to_string(),
            department: self.department.trim().to_string(),
            year_of_study: self.year_of_study,
            membership_status: MembershipStatus::Pending,
            volunteer_hours: 0.0,
            interests: clean_tags(self.interests),
            emergency_contact: self.emergency_contact,
            joined_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub department: Option<String>,
    pub year_of_study: Option<u8>,
    pub interests: Option<Vec<String>>,
    pub emergency_contact: Option<EmergencyContact>,
}

impl Validate for UpdateMemberRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("department", self.department.as_deref(), 2, 100);
        v.optional_range("year_of_study", self.year_of_study, 1, 10);
        if let Some(interests) = &self.interests {
            v.check(interests.len() <= 20, "interests", "at most 20 interests");
        }
        validate_contact(v, self.emergency_contact.as_ref());
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct MemberListQuery {
    pub department: Option<String>,
    pub status: Option<MembershipStatus>,
    /// Matches student id or department.
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for MemberListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("department", self.department.as_deref(), 1, 100);
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MemberStatusRequest {
    pub status: MembershipStatus,
}

impl Validate for MemberStatusRequest {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VolunteerHoursRequest {
    pub hours: f64,
}

impl Validate for VolunteerHoursRequest {
    fn validate(&self, v: &mut Validator) {
        v.check(
            self.hours.is_finite() && self.hours > 0.0,
            "hours",
            "hours must be greater than 0",
        );
    }
}

/// One attended event or session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
}

/// Member profile joined with its account and attendance history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberDetail {
    pub member: Member,
    pub user: UserProfile,
    pub attended_events: Vec<AttendanceRecord>,
    pub attended_sessions: Vec<AttendanceRecord>,
}

fn detail(state: &AppState, member: Member) -> ServiceResult<MemberDetail> {
    let storage = state.storage();
    let user = UserRepository::new(storage).get(&member.user_id)?;
    let user_id = member.user_id.as_str();

    let mut attended_events: Vec<_> = storage
        .collection::<Event>()
        .find(|e| e.registration_for(user_id).is_some_and(|r| r.attended))?
        .into_iter()
        .map(|e| AttendanceRecord { id: e.id, title: e.title, date: e.start_date })
        .collect();
    attended_events.sort_by(|a, b| b.date.cmp(&a.date));

    let mut attended_sessions: Vec<_> = storage
        .collection::<PeerEducationSession>()
        .find(|s| s.participant(user_id).is_some_and(|p| p.attended))?
        .into_iter()
        .map(|s| AttendanceRecord { id: s.id, title: s.title, date: s.scheduled_at })
        .collect();
    attended_sessions.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(MemberDetail {
        member,
        user: user.profile(),
        attended_events,
        attended_sessions,
    })
}

pub async fn create_profile(
    state: &AppState,
    user: &AuthenticatedUser,
    req: MemberProfileRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Member> {
    let member = req.into_member(&user.user_id, now);
    let _gate = state.exclusive().await;
    MemberRepository::new(state.storage()).create(&member)?;
    tracing::info!(member_id = %member.id, user_id = %user.user_id, "Member profile created");
    Ok(member)
}

fn own_member(state: &AppState, user_id: &str) -> ServiceResult<Member> {
    MemberRepository::new(state.storage())
        .find_by_user(user_id)?
        .ok_or_else(|| ServiceError::not_found("Member profile not found"))
}

pub async fn my_profile(state: &AppState, user: &AuthenticatedUser) -> ServiceResult<MemberDetail> {
    let member = own_member(state, &user.user_id)?;
    detail(state, member)
}

pub async fn get(state: &AppState, member_id: &str) -> ServiceResult<MemberDetail> {
    let member = MemberRepository::new(state.storage()).get(member_id)?;
    detail(state, member)
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthenticatedUser,
    req: UpdateMemberRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Member> {
    let _gate = state.exclusive().await;
    let mut member = own_member(state, &user.user_id)?;
    if let Some(department) = req.department {
        member.department = department.trim().to_string();
    }
    super::assign(&mut member.year_of_study, req.year_of_study);
    if let Some(interests) = req.interests {
        member.interests = clean_tags(interests);
    }
    if req.emergency_contact.is_some() {
        member.emergency_contact = req.emergency_contact;
    }
    member.updated_at = now;
    MemberRepository::new(state.storage()).update(&member)?;
    Ok(member)
}

pub async fn list(state: &AppState, query: MemberListQuery) -> ServiceResult<Paginated<Member>> {
    let department = query.department.as_deref().map(str::to_lowercase);
    let mut members: Vec<_> = MemberRepository::new(state.storage())
        .list_all()?
        .into_iter()
        .filter(|m| {
            department
                .as_deref()
                .is_none_or(|d| m.department.to_lowercase() == d)
                && query.status.is_none_or(|s| m.membership_status == s)
                && matches_search(query.search.as_deref(), &[&m.student_id, &m.department])
        })
        .collect();
    members.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(members, params))
}

/// Change a member's standing; the owning account's status follows.
pub async fn set_status(
    state: &AppState,
    admin: &AuthenticatedUser,
    member_id: &str,
    status: MembershipStatus,
    now: DateTime<Utc>,
) -> ServiceResult<Member> {
    let storage = state.storage();
    let _gate = state.exclusive().await;
    let members = MemberRepository::new(storage);
    let mut member = members.get(member_id)?;
    member.membership_status = status;
    member.updated_at = now;
    members.update(&member)?;

    let users = UserRepository::new(storage);
    match users.get(&member.user_id) {
        Ok(mut user) => {
            user.membership_status = status;
            user.updated_at = now;
            users.update(&mut user)?;
        }
        Err(e) => tracing::warn!(error = %e, member_id, "Member has no account to update"),
    }

    audit_log!(storage, AuditEventType::MemberStatusChanged, admin, "member", member_id);
    Ok(member)
}

pub async fn add_volunteer_hours(
    state: &AppState,
    admin: &AuthenticatedUser,
    member_id: &str,
    hours: f64,
    now: DateTime<Utc>,
) -> ServiceResult<Member> {
    let _gate = state.exclusive().await;
    let members = MemberRepository::new(state.storage());
    let mut member = members.get(member_id)?;
    member.add_volunteer_hours(hours, now)?;
    members.update(&member)?;
    tracing::info!(member_id, hours, by = %admin.user_id, "Volunteer hours added");
    Ok(member)
}
