// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{Role, RoleSet};
use crate::domain::User;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Role tags at issue time. Informational only: the gate re-reads roles
    /// from the stored user on every request.
    #[serde(default)]
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated user information resolved from a bearer token.
///
/// This is the principal type handed to every handler behind the gate. It
/// never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub roles: RoleSet,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build a principal from the stored record; roles are the union of the
    /// legacy and current fields.
    pub fn from_user(user: &User, expires_at: i64) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.role_set(),
            expires_at,
        }
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.roles.intersects(required)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }
}
