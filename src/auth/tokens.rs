// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuance and verification (HS256).

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use utoipa::ToSchema;

use super::{claims::TokenClaims, AuthError};
use crate::domain::User;

/// Issuer stamped into and required from every token.
pub const TOKEN_ISSUER: &str = "healthclub-server";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly signed token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            sub: user.id.clone(),
            roles: user.role_set().to_vec(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.validate_aud = false;

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::MalformedToken,
            })
    }
}

/// Convert a claims timestamp back to a date.
pub fn expiry_of(claims: &TokenClaims) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(claims.exp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::people::NewUser;

    fn user() -> User {
        User::new(
            NewUser {
                username: "tok".into(),
                email: "tok@uni.edu".into(),
                password_hash: "h".into(),
                first_name: "T".into(),
                last_name: "K".into(),
                phone: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn issue_then_verify() {
        let issuer = TokenIssuer::new(b"test-secret", 1);
        let user = user();
        let issued = issuer.issue(&user, Utc::now()).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(expiry_of(&claims).map(|d| d.timestamp()), Some(issued.expires_at.timestamp()));
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let issued = TokenIssuer::new(b"one", 1).issue(&user(), Utc::now()).unwrap();
        let err = TokenIssuer::new(b"two", 1).verify(&issued.token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(b"secret", 1);
        let issued = issuer
            .issue(&user(), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(issuer.verify(&issued.token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = TokenIssuer::new(b"secret", 1);
        assert!(matches!(issuer.verify("not.a.jwt"), Err(AuthError::MalformedToken)));
    }
}
