// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Services
//!
//! Each service loads documents, runs the guarded transitions defined in
//! [`crate::domain`], and persists the result. Every read-modify-write holds
//! [`AppState::exclusive`](crate::state::AppState::exclusive) from the first
//! read to the last write, so check-then-append sequences (capacity,
//! uniqueness) cannot interleave.
//!
//! Request payload types live next to the operation that consumes them and
//! implement [`Validate`](crate::validation::Validate).

use crate::{
    error::ServiceResult,
    storage::{AuditEvent, AuditRepository, Document, DocumentStorage},
};

pub mod accounts;
pub mod admin;
pub mod events;
pub mod feedback;
pub mod library;
pub mod members;
pub mod moderation;
pub mod people;
pub mod questions;
pub mod sessions;
pub mod settings;

/// Load one document; a missing id becomes `NotFound("<Label> not found")`.
pub(crate) fn load<T: Document>(storage: &DocumentStorage, id: &str) -> ServiceResult<T> {
    Ok(storage.collection::<T>().get(id)?)
}

/// Write an audit event that the `audit_log!` shorthand cannot express.
pub(crate) fn record(storage: &DocumentStorage, event: AuditEvent) {
    if let Err(e) = AuditRepository::new(storage).log(&event) {
        tracing::warn!(error = %e, "Failed to write audit event");
    }
}

/// Overwrite `slot` when an update supplies a value.
pub(crate) fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Case-insensitive substring match used by `search` filters.
pub(crate) fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&needle))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::{
        auth::{AuthenticatedUser, Role, RoleSet},
        domain::{people::NewUser, User},
        state::AppState,
        storage::UserRepository,
    };

    /// Store a user with the given roles and return its principal.
    pub(crate) fn principal(state: &AppState, username: &str, roles: &[Role]) -> AuthenticatedUser {
        let mut user = User::new(
            NewUser {
                username: username.to_string(),
                email: format!("{username}@uni.edu"),
                password_hash: "unused".into(),
                first_name: "Test".into(),
                last_name: username.to_string(),
                phone: None,
            },
            Utc::now(),
        );
        user.roles = roles.to_vec();
        UserRepository::new(state.storage()).create(&user).unwrap();
        AuthenticatedUser {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            roles: RoleSet::from_roles(roles.iter().copied()),
            expires_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_any_field_case_insensitively() {
        assert!(matches_search(None, &["anything"]));
        assert!(matches_search(Some("  "), &["anything"]));
        assert!(matches_search(Some("SLEEP"), &["Better sleep", "x"]));
        assert!(!matches_search(Some("stress"), &["Better sleep"]));
    }

    #[test]
    fn assign_only_overwrites_some() {
        let mut value = 1;
        assign(&mut value, None);
        assert_eq!(value, 1);
        assign(&mut value, Some(2));
        assert_eq!(value, 2);
    }
}
