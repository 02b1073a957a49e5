// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health Advocacy Club - Membership Server
//!
//! REST backend for a university health-advocacy club: accounts and
//! membership, events, peer-education sessions, the resource library,
//! moderated stories and galleries, and an anonymous question board.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and the OpenAPI document
//! - `auth` - Session tokens, password hashing and role gates
//! - `domain` - Entities and their invariants
//! - `services` - Use cases over the store
//! - `storage` - JSON document store and audit log

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod state;
pub mod storage;
pub mod uploads;
pub mod validation;
