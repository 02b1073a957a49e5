// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication, and one of
//! the tier aliases to require a role:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse { ... }
//! async fn admin_only(Authorized(admin, _): AdminOnly) -> impl IntoResponse { ... }
//! ```

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{
    roles::{
        authorize, AdminTier, FacilitatorTier, ModeratorTier, ResponderTier, RoleGate,
        VerifierTier,
    },
    tokens::expiry_of,
    AuthError, AuthenticatedUser,
};
use crate::{state::AppState, storage::UserRepository};

/// Extractor for authenticated users.
///
/// Uses the principal attached by [`super::middleware::authenticate`] when
/// present, otherwise resolves the bearer token itself.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(&parts.headers)?;
        let user = resolve_principal(state, token)?;
        Ok(Auth(user))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify the token and load the principal it names.
///
/// Roles come from the stored record, not the token, so role changes and
/// deactivation take effect immediately.
pub fn resolve_principal(state: &AppState, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = state.tokens().verify(token)?;

    let user = UserRepository::new(state.storage())
        .get(&claims.sub)
        .map_err(|e| match e {
            crate::storage::StorageError::NotFound(_) => AuthError::UnknownPrincipal,
            other => AuthError::InternalError(other.to_string()),
        })?;

    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }

    let expires_at = expiry_of(&claims).map(|d| d.timestamp()).unwrap_or(claims.exp);
    Ok(AuthenticatedUser::from_user(&user, expires_at))
}

/// Authenticated user holding at least one role of tier `G`.
pub struct Authorized<G: RoleGate>(pub AuthenticatedUser, pub PhantomData<G>);

impl<G: RoleGate> Authorized<G> {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.0
    }
}

impl<G> FromRequestParts<AppState> for Authorized<G>
where
    G: RoleGate + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        authorize(&user.roles, G::ROLES)?;
        Ok(Authorized(user, PhantomData))
    }
}

/// Requires admin or superadmin.
pub type AdminOnly = Authorized<AdminTier>;
/// Requires admin, superadmin or moderator.
pub type ModeratorOnly = Authorized<ModeratorTier>;
/// Requires a role allowed to answer questions.
pub type ResponderOnly = Authorized<ResponderTier>;
/// Requires a role allowed to verify answers.
pub type VerifierOnly = Authorized<VerifierTier>;
/// Requires a role allowed to run sessions.
pub type FacilitatorOnly = Authorized<FacilitatorTier>;

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::{Role, RoleSet};
    use crate::domain::{people::NewUser, User};
    use crate::state::tests::test_state;
    use axum::http::Request;
    use chrono::Utc;

    fn stored_user(state: &AppState, roles: &[Role], active: bool) -> User {
        let mut user = User::new(
            NewUser {
                username: format!("user_{}", roles.len()),
                email: format!("user{}@uni.edu", roles.len()),
                password_hash: "h".into(),
                first_name: "Test".into(),
                last_name: "User".into(),
                phone: None,
            },
            Utc::now(),
        );
        user.roles = roles.to_vec();
        user.is_active = active;
        UserRepository::new(state.storage()).create(&user).unwrap();
        user
    }

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp) = test_state();
        let mut parts = parts_with_token(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_resolves_stored_user() {
        let (state, _temp) = test_state();
        let user = stored_user(&state, &[Role::Member], true);
        let token = state.tokens().issue(&user, Utc::now()).unwrap().token;
        let mut parts = parts_with_token(Some(&token));

        let Auth(principal) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert!(principal.roles.contains(Role::Member));
    }

    #[tokio::test]
    async fn deleted_user_is_unknown_principal() {
        let (state, _temp) = test_state();
        let user = stored_user(&state, &[Role::Member], true);
        let token = state.tokens().issue(&user, Utc::now()).unwrap().token;
        UserRepository::new(state.storage()).delete(&user.id).unwrap();

        let mut parts = parts_with_token(Some(&token));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UnknownPrincipal)));
    }

    #[tokio::test]
    async fn inactive_user_is_forbidden() {
        let (state, _temp) = test_state();
        let user = stored_user(&state, &[Role::Member], false);
        let token = state.tokens().issue(&user, Utc::now()).unwrap().token;

        let mut parts = parts_with_token(Some(&token));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _temp) = test_state();
        let mut parts = parts_with_token(None);
        parts.extensions.insert(AuthenticatedUser {
            user_id: "from_middleware".into(),
            username: "mw".into(),
            email: "mw@uni.edu".into(),
            roles: RoleSet::from_roles([Role::Admin]),
            expires_at: 0,
        });

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "from_middleware");
    }

    #[tokio::test]
    async fn admin_tier_rejects_member_and_accepts_superadmin() {
        let (state, _temp) = test_state();

        let member = AuthenticatedUser {
            user_id: "m".into(),
            username: "m".into(),
            email: "m@uni.edu".into(),
            roles: RoleSet::from_roles([Role::Member]),
            expires_at: 0,
        };
        let mut parts = parts_with_token(None);
        parts.extensions.insert(member);
        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let superadmin = AuthenticatedUser {
            user_id: "s".into(),
            username: "s".into(),
            email: "s@uni.edu".into(),
            roles: RoleSet::from_roles([Role::Superadmin]),
            expires_at: 0,
        };
        let mut parts = parts_with_token(None);
        parts.extensions.insert(superadmin);
        assert!(AdminOnly::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn optional_auth_returns_none_on_bad_token() {
        let (state, _temp) = test_state();
        let mut parts = parts_with_token(Some("garbage"));

        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(user.is_none());
    }
}
