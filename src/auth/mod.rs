// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens for the club API.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in with username/email and password
//! 2. Server verifies the PBKDF2 hash and issues an HS256 token (`sub` = user id)
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. Server:
//!    - Verifies signature, expiry and issuer
//!    - Loads the user named by `sub`; missing → 401, deactivated → 403
//!    - Unions the legacy `role` field with `roles` for authorization
//!
//! ## Security
//!
//! - Password hashes never appear in responses
//! - Consecutive failed logins lock the account for a configured period
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod tokens;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{
    AdminOnly, Auth, Authorized, FacilitatorOnly, ModeratorOnly, OptionalAuth, ResponderOnly,
    VerifierOnly,
};
pub use roles::{Role, RoleSet};
