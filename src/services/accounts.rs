// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and self-service account management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{members::MemberProfileRequest, record};
use crate::{
    auth::{
        password::{hash_password, verify_password},
        AuthError, AuthenticatedUser,
    },
    domain::{people::NewUser, Feature, User, UserProfile},
    error::{ServiceError, ServiceResult},
    state::AppState,
    storage::{AuditEvent, AuditEventType, MemberRepository, UserRepository},
    validation::{is_valid_username, Validate, Validator, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Create the member profile in the same request.
    pub member: Option<MemberProfileRequest>,
}

fn validate_password(v: &mut Validator, field: &str, password: &str) {
    v.length(field, password, PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH);
}

impl Validate for RegisterRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("username", &self.username, 3, 30);
        v.check(
            is_valid_username(self.username.trim()),
            "username",
            "username may only contain letters, numbers and underscores",
        );
        v.email("email", &self.email);
        validate_password(v, "password", &self.password);
        v.length("first_name", &self.first_name, 1, 50);
        v.length("last_name", &self.last_name, 1, 50);
        v.optional_length("phone", self.phone.as_deref(), 5, 30);
        if let Some(member) = &self.member {
            member.validate(v);
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or username.
    pub login: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self, v: &mut Validator) {
        v.required("login", &self.login);
        v.required("password", &self.password);
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self, v: &mut Validator) {
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        v.optional_length("first_name", self.first_name.as_deref(), 1, 50);
        v.optional_length("last_name", self.last_name.as_deref(), 1, 50);
        v.optional_length("phone", self.phone.as_deref(), 5, 30);
        v.optional_url("profile_image", self.profile_image.as_deref());
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self, v: &mut Validator) {
        v.required("current_password", &self.current_password);
        validate_password(v, "new_password", &self.new_password);
    }
}

/// Token plus the account it was issued for.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Runs PBKDF2 on the blocking pool.
async fn hash_off_thread(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Unexpected(format!("password hashing task failed: {e}")))?
        .map_err(ServiceError::from)
}

/// Runs PBKDF2 verification on the blocking pool.
async fn verify_off_thread(password: String, stored: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ServiceError::Unexpected(format!("password verification task failed: {e}")))
}

fn issue(state: &AppState, user: &User, now: DateTime<Utc>) -> ServiceResult<AuthResponse> {
    let issued = state.tokens().issue(user, now)?;
    Ok(AuthResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: user.profile(),
    })
}

pub async fn register(state: &AppState, req: RegisterRequest, now: DateTime<Utc>) -> ServiceResult<AuthResponse> {
    state.settings().await.ensure_enabled(Feature::MemberRegistration)?;

    let password_hash = hash_off_thread(req.password).await?;
    let user = User::new(
        NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        },
        now,
    );

    let storage = state.storage();
    let _gate = state.exclusive().await;
    let users = UserRepository::new(storage);
    users.create(&user)?;

    if let Some(profile) = req.member {
        let member = profile.into_member(&user.id, now);
        if let Err(e) = MemberRepository::new(storage).create(&member) {
            if let Err(cleanup) = users.delete(&user.id) {
                tracing::error!(error = %cleanup, user_id = %user.id, "Failed to roll back registration");
            }
            return Err(e.into());
        }
    }

    record(
        storage,
        AuditEvent::new(AuditEventType::UserRegistered).with_user(&user.id),
    );
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    issue(state, &user, now)
}

pub async fn login(state: &AppState, req: LoginRequest, now: DateTime<Utc>) -> ServiceResult<AuthResponse> {
    let security = state.settings().await.security;
    let storage = state.storage();
    let users = UserRepository::new(storage);

    let Some(candidate) = users.find_by_login(&req.login)? else {
        record(
            storage,
            AuditEvent::new(AuditEventType::LoginFailed)
                .with_details(serde_json::json!({ "login": req.login }))
                .failed("unknown login"),
        );
        return Err(AuthError::InvalidCredentials.into());
    };
    ensure_can_log_in(&candidate, now)?;

    let verified = verify_off_thread(req.password, candidate.password_hash.clone()).await?;

    // Counters are re-read under the gate so concurrent attempts all count.
    let _gate = state.exclusive().await;
    let mut user = users.get(&candidate.id)?;
    ensure_can_log_in(&user, now)?;

    if !verified {
        let locked = user.record_failed_login(now, security.max_login_attempts, security.lockout_minutes);
        users.update(&mut user)?;
        let event_type = if locked {
            tracing::warn!(user_id = %user.id, "Account locked after repeated failed logins");
            AuditEventType::AccountLocked
        } else {
            AuditEventType::LoginFailed
        };
        record(
            storage,
            AuditEvent::new(event_type).with_user(&user.id).failed("invalid password"),
        );
        return Err(AuthError::InvalidCredentials.into());
    }

    user.record_successful_login(now);
    users.update(&mut user)?;
    record(
        storage,
        AuditEvent::new(AuditEventType::LoginSucceeded).with_user(&user.id),
    );

    issue(state, &user, now)
}

fn ensure_can_log_in(user: &User, now: DateTime<Utc>) -> ServiceResult<()> {
    if !user.is_active {
        return Err(AuthError::AccountDisabled.into());
    }
    if user.is_locked(now) {
        let until = user.locked_until.map(|t| t.to_rfc3339()).unwrap_or_default();
        return Err(AuthError::AccountLocked(until).into());
    }
    Ok(())
}

pub async fn me(state: &AppState, principal: &AuthenticatedUser) -> ServiceResult<UserProfile> {
    Ok(UserRepository::new(state.storage()).get(&principal.user_id)?.profile())
}

pub async fn update_profile(
    state: &AppState,
    principal: &AuthenticatedUser,
    req: UpdateProfileRequest,
    now: DateTime<Utc>,
) -> ServiceResult<UserProfile> {
    let _gate = state.exclusive().await;
    let users = UserRepository::new(state.storage());
    let mut user = users.get(&principal.user_id)?;

    if let Some(email) = req.email {
        user.email = crate::domain::normalize_email(&email);
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if req.phone.is_some() {
        user.phone = req.phone;
    }
    if req.profile_image.is_some() {
        user.profile_image = req.profile_image;
    }
    user.updated_at = now;
    users.update(&mut user)?;

    Ok(user.profile())
}

pub async fn change_password(
    state: &AppState,
    principal: &AuthenticatedUser,
    req: ChangePasswordRequest,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let storage = state.storage();
    let user = UserRepository::new(storage).get(&principal.user_id)?;
    if !verify_off_thread(req.current_password, user.password_hash).await? {
        return Err(ServiceError::field(
            "current_password",
            "Current password is incorrect",
        ));
    }
    let password_hash = hash_off_thread(req.new_password).await?;

    let _gate = state.exclusive().await;
    let users = UserRepository::new(storage);
    let mut user = users.get(&principal.user_id)?;
    user.password_hash = password_hash;
    user.updated_at = now;
    users.update(&mut user)?;

    crate::audit_log!(storage, AuditEventType::PasswordChanged, principal);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::state::tests::test_state;
    use crate::storage::AuditRepository;

    fn registration(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@uni.edu"),
            password: password.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
            member: None,
        }
    }

    fn login_req(login: &str, password: &str) -> LoginRequest {
        LoginRequest { login: login.into(), password: password.into() }
    }

    #[tokio::test]
    async fn register_then_login_by_username_or_email() {
        let (state, _temp) = test_state();
        let now = Utc::now();

        let registered = register(&state, registration("ada", "secret123"), now).await.unwrap();
        assert_eq!(registered.user.roles.to_vec(), vec![Role::Member]);
        let claims = state.tokens().verify(&registered.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);

        assert!(login(&state, login_req("ADA", "secret123"), now).await.is_ok());
        let by_email = login(&state, login_req("Ada@Uni.edu", "secret123"), now).await.unwrap();
        assert!(by_email.user.last_login.is_some());

        let events = AuditRepository::new(state.storage())
            .read_events(&now.format("%Y-%m-%d").to_string())
            .unwrap();
        assert!(events.iter().any(|e| e.event_type == AuditEventType::UserRegistered));
    }

    #[tokio::test]
    async fn short_password_fails_validation_without_creating_user() {
        let (state, _temp) = test_state();
        let err = registration("ada", "abc").validated().unwrap_err();
        match err {
            ServiceError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(UserRepository::new(state.storage()).list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        register(&state, registration("ada", "secret123"), now).await.unwrap();

        let mut dup = registration("ada2", "secret123");
        dup.email = "ADA@uni.edu".into();
        assert!(matches!(
            register(&state, dup, now).await,
            Err(ServiceError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        register(&state, registration("ada", "secret123"), now).await.unwrap();

        for _ in 0..5 {
            assert!(matches!(
                login(&state, login_req("ada", "wrong-password"), now).await,
                Err(ServiceError::Unauthenticated(_))
            ));
        }
        assert!(matches!(
            login(&state, login_req("ada", "secret123"), now).await,
            Err(ServiceError::Forbidden(_))
        ));
        let later = now + chrono::Duration::minutes(16);
        assert!(login(&state, login_req("ada", "secret123"), later).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failed_logins_all_count() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let registered = register(&state, registration("ada", "secret123"), now).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let state = state.clone();
            tasks.spawn(async move { login(&state, login_req("ada", "wrong-password"), now).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(matches!(result.unwrap(), Err(ServiceError::Unauthenticated(_))));
        }

        let user = UserRepository::new(state.storage()).get(&registered.user.id).unwrap();
        assert_eq!(user.failed_login_attempts, 4);
        assert!(!user.is_locked(now));
    }

    #[tokio::test]
    async fn registration_can_be_disabled() {
        let (state, _temp) = test_state();
        let mut settings = state.settings().await;
        settings.features.member_registration = false;
        state.replace_settings(settings).await.unwrap();

        assert!(matches!(
            register(&state, registration("ada", "secret123"), Utc::now()).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let registered = register(&state, registration("ada", "secret123"), now).await.unwrap();
        let principal = AuthenticatedUser {
            user_id: registered.user.id.clone(),
            username: "ada".into(),
            email: "ada@uni.edu".into(),
            roles: registered.user.roles.clone(),
            expires_at: 0,
        };

        let wrong = ChangePasswordRequest {
            current_password: "nope".into(),
            new_password: "another123".into(),
        };
        match change_password(&state, &principal, wrong, now).await.unwrap_err() {
            ServiceError::ValidationFailed(errors) => assert_eq!(errors[0].field, "current_password"),
            other => panic!("unexpected error: {other:?}"),
        }

        let right = ChangePasswordRequest {
            current_password: "secret123".into(),
            new_password: "another123".into(),
        };
        change_password(&state, &principal, right, now).await.unwrap();
        assert!(login(&state, login_req("ada", "another123"), now).await.is_ok());
    }
}
