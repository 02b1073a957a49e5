// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership checks for user-generated content.

use crate::auth::AuthenticatedUser;
use crate::domain::{Comment, Gallery, Story};
use crate::error::{ServiceError, ServiceResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    fn owner_user_id(&self) -> &str;
}

/// Trait for enforcing ownership.
pub trait OwnershipEnforcer {
    /// Returns `Forbidden` unless `user` owns this resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> ServiceResult<()>;

    fn is_owned_by(&self, user_id: &str) -> bool;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> ServiceResult<()> {
        if self.is_owned_by(&user.user_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(
                "You do not have permission to modify this content",
            ))
        }
    }

    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id() == user_id
    }
}

impl OwnedResource for Story {
    fn owner_user_id(&self) -> &str {
        &self.author_id
    }
}

impl OwnedResource for Gallery {
    fn owner_user_id(&self) -> &str {
        &self.uploaded_by
    }
}

impl OwnedResource for Comment {
    fn owner_user_id(&self) -> &str {
        &self.author_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, RoleSet};

    struct TestResource {
        owner: String,
    }

    impl OwnedResource for TestResource {
        fn owner_user_id(&self) -> &str {
            &self.owner
        }
    }

    fn make_user(user_id: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            email: format!("{user_id}@uni.edu"),
            roles: RoleSet::from_roles([Role::Member]),
            expires_at: 0,
        }
    }

    #[test]
    fn owner_passes() {
        let resource = TestResource {
            owner: "user_1".into(),
        };
        assert!(resource.verify_ownership(&make_user("user_1")).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let resource = TestResource {
            owner: "user_1".into(),
        };
        assert!(matches!(
            resource.verify_ownership(&make_user("user_2")),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
