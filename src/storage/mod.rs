// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Storage Module
//!
//! Persistent storage as JSON documents on the local filesystem, rooted at
//! `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! <data>/
//!   users/{id}.json
//!   members/{id}.json
//!   advisors/{id}.json
//!   peer_educators/{id}.json
//!   events/{id}.json        # registrations embedded
//!   sessions/{id}.json      # participants embedded
//!   resources/{id}.json     # completions and ratings embedded
//!   training/{id}.json      # completions embedded
//!   stories/{id}.json       # likes and comments embedded
//!   galleries/{id}.json
//!   questions/{id}.json
//!   feedback/{id}.json
//!   settings.json           # singleton
//!   uploads/                # local upload backend
//!   audit/{date}/events.jsonl
//! ```
//!
//! Embedded lists live inside their parent document, so every mutation is a
//! single-file rewrite. Read-modify-write sequences must run under
//! [`crate::state::AppState::exclusive`].

pub mod audit;
pub mod document_store;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use document_store::{DocumentStorage, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use repository::{
    Collection, Document, MemberRepository, ProfileRepository, SettingsRepository, UserRepository,
};
