// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Accounts and the profiles hanging off them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use super::new_id;
use crate::auth::{Role, RoleSet};
use crate::error::{ServiceError, ServiceResult};

/// Club membership standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Pending,
    Active,
    Inactive,
    Suspended,
}

/// Account record. The password hash never leaves the auth layer; API
/// responses use [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Normalized with [`normalize_email`].
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Legacy singular role from older records. Folded into `roles` on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub is_active: bool,
    #[serde(default)]
    pub membership_status: MembershipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_login_attempts: u32,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when an account is created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl User {
    pub fn new(input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            username: input.username.trim().to_string(),
            email: normalize_email(&input.email),
            password_hash: input.password_hash,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone: input.phone,
            role: None,
            roles: vec![Role::Member],
            is_active: true,
            membership_status: MembershipStatus::Pending,
            profile_image: None,
            last_login: None,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Effective roles: legacy field unioned with the current set.
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_legacy(self.role, &self.roles)
    }

    /// Fold the legacy role into the set and clear it.
    pub fn normalize_roles(&mut self) {
        self.roles = self.role_set().to_vec();
        self.role = None;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Count a failed login. Returns true when this failure locks the account.
    pub fn record_failed_login(
        &mut self,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout_minutes: i64,
    ) -> bool {
        self.failed_login_attempts += 1;
        self.updated_at = now;
        if max_attempts > 0 && self.failed_login_attempts >= max_attempts {
            self.locked_until = Some(now + Duration::minutes(lockout_minutes));
            self.failed_login_attempts = 0;
            return true;
        }
        false
    }

    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            roles: self.role_set(),
            is_active: self.is_active,
            membership_status: self.membership_status,
            profile_image: self.profile_image.clone(),
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

/// Public view of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub roles: RoleSet,
    pub is_active: bool,
    pub membership_status: MembershipStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Canonical form used for email uniqueness and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Canonical form used for username uniqueness.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// Student membership profile, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub id: String,
    pub user_id: String,
    pub student_id: String,
    pub department: String,
    pub year_of_study: u8,
    pub membership_status: MembershipStatus,
    pub volunteer_hours: f64,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Largest single volunteer-hours entry accepted.
pub const MAX_VOLUNTEER_HOURS_ENTRY: f64 = 24.0;

impl Member {
    pub fn add_volunteer_hours(&mut self, hours: f64, now: DateTime<Utc>) -> ServiceResult<()> {
        if !hours.is_finite() || hours <= 0.0 || hours > MAX_VOLUNTEER_HOURS_ENTRY {
            return Err(ServiceError::field(
                "hours",
                format!("hours must be greater than 0 and at most {MAX_VOLUNTEER_HOURS_ENTRY}"),
            ));
        }
        self.volunteer_hours += hours;
        self.updated_at = now;
        Ok(())
    }
}

/// Faculty or staff advisor to the club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Advisor {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub department: String,
    pub specialization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeerEducatorStatus {
    #[default]
    Trainee,
    Certified,
    Inactive,
}

/// Student trained to run peer-education sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeerEducator {
    pub id: String,
    pub user_id: String,
    pub status: PeerEducatorStatus,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub certification_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PeerEducator {
    /// Move to `status`, stamping the certification date on first certification.
    pub fn set_status(&mut self, status: PeerEducatorStatus, now: DateTime<Utc>) {
        if status == PeerEducatorStatus::Certified && self.certification_date.is_none() {
            self.certification_date = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }
}
