// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role tags and the authorization check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Role tags granting access to specific operations.
///
/// ## Tiers
///
/// - `Admin`, `Superadmin` - back office; only a superadmin may grant admin roles
/// - `Moderator` - story/gallery/comment/question moderation
/// - `Advisor`, `PeerEducator` - answer anonymous questions, run sessions
/// - `Member` - every registered account
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
    Superadmin,
    Advisor,
    PeerEducator,
    Moderator,
}

impl Role {
    /// Parse role from string (case-insensitive, `-` and `_` interchangeable).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            "superadmin" | "super_admin" => Some(Role::Superadmin),
            "advisor" => Some(Role::Advisor),
            "peer_educator" => Some(Role::PeerEducator),
            "moderator" => Some(Role::Moderator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
            Role::Advisor => "advisor",
            Role::PeerEducator => "peer_educator",
            Role::Moderator => "moderator",
        }
    }

    /// Roles that only a superadmin may grant or revoke.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-office routes.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];
/// Content and question moderation.
pub const MODERATOR_ROLES: &[Role] = &[Role::Admin, Role::Superadmin, Role::Moderator];
/// Answering anonymous questions.
pub const RESPONDER_ROLES: &[Role] = &[
    Role::Admin,
    Role::Superadmin,
    Role::Advisor,
    Role::PeerEducator,
];
/// Verifying answers given by others.
pub const VERIFIER_ROLES: &[Role] = &[Role::Admin, Role::Superadmin, Role::Advisor];
/// Running peer-education sessions.
pub const FACILITATOR_ROLES: &[Role] = &[Role::Admin, Role::Superadmin, Role::PeerEducator];

/// A named set of roles guarding a group of routes.
///
/// Used as the type parameter of [`super::Authorized`].
pub trait RoleGate {
    const ROLES: &'static [Role];
}

macro_rules! role_gate {
    ($(#[$meta:meta])* $name:ident => $roles:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl RoleGate for $name {
            const ROLES: &'static [Role] = $roles;
        }
    };
}

role_gate!(AdminTier => ADMIN_ROLES);
role_gate!(ModeratorTier => MODERATOR_ROLES);
role_gate!(ResponderTier => RESPONDER_ROLES);
role_gate!(VerifierTier => VERIFIER_ROLES);
role_gate!(FacilitatorTier => FACILITATOR_ROLES);

/// Normalized set of role tags held by a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<Role>)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Union of the legacy singular field and the current set.
    ///
    /// Older records carry their role in `role`, newer ones in `roles`.
    pub fn from_legacy(legacy: Option<Role>, roles: &[Role]) -> Self {
        Self(legacy.into_iter().chain(roles.iter().copied()).collect())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    /// True when at least one of `required` is held.
    pub fn intersects(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.0.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.intersects(ADMIN_ROLES)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.0.iter().copied().collect()
    }
}

/// Allow iff the principal holds at least one required role.
pub fn authorize(roles: &RoleSet, required: &[Role]) -> Result<(), AuthError> {
    if roles.intersects(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::PartialSchema;

    #[test]
    fn new_accounts_default_to_member() {
        assert_eq!(Role::default(), Role::Member);
    }

    #[test]
    fn role_set_is_documented_as_a_role_array() {
        let schema = serde_json::to_value(RoleSet::schema()).unwrap();
        assert_eq!(schema["type"], "array");
        assert!(schema["items"].is_object());
    }

    #[test]
    fn member_is_rejected_from_admin_tier() {
        let roles = RoleSet::from_roles([Role::Member]);
        assert!(matches!(
            authorize(&roles, ADMIN_ROLES),
            Err(AuthError::InsufficientPermissions)
        ));
    }

    #[test]
    fn admin_and_superadmin_pass_admin_tier() {
        assert!(authorize(&RoleSet::from_roles([Role::Admin]), ADMIN_ROLES).is_ok());
        assert!(authorize(&RoleSet::from_roles([Role::Superadmin]), ADMIN_ROLES).is_ok());
    }

    #[test]
    fn legacy_role_is_unioned_with_set() {
        let roles = RoleSet::from_legacy(Some(Role::Admin), &[Role::Member]);
        assert!(roles.contains(Role::Admin));
        assert!(roles.contains(Role::Member));
        assert!(authorize(&roles, ADMIN_ROLES).is_ok());

        let no_legacy = RoleSet::from_legacy(None, &[Role::Moderator]);
        assert_eq!(no_legacy.to_vec(), vec![Role::Moderator]);
    }

    #[test]
    fn empty_set_is_never_authorized() {
        assert!(authorize(&RoleSet::new(), MODERATOR_ROLES).is_err());
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("peer-educator"), Some(Role::PeerEducator));
        assert_eq!(Role::from_str("super_admin"), Some(Role::Superadmin));
        assert_eq!(Role::from_str("client"), None);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&RoleSet::from_roles([Role::PeerEducator])).unwrap();
        assert_eq!(json, r#"["peer_educator"]"#);
    }

    #[test]
    fn privileged_roles() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::Superadmin.is_privileged());
        assert!(!Role::Moderator.is_privileged());
    }
}
