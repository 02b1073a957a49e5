// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Envelope and Pagination
//!
//! Every JSON response uses the same envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "optional" }
//! { "success": false, "message": "Event is full", "errors": [ ... ] }
//! ```
//!
//! The failure side is rendered by [`crate::error::ApiError`]. List endpoints
//! put a [`Paginated`] page in `data`.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::ServerConfig,
    validation::{Validate, Validator},
};

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler result for a 200 envelope.
pub type ApiJson<T> = Json<ApiResponse<T>>;

/// Handler result for a 201 envelope.
pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> ApiJson<T> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> ApiJson<T> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        })
    }

    pub fn created(data: T) -> Created<T> {
        (StatusCode::CREATED, Self::ok(data))
    }
}

impl ApiResponse<()> {
    /// Success with only a message, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> ApiJson<()> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
        })
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Upper bound on `page` accepted from clients.
const MAX_PAGE: usize = 100_000;

/// Hard ceiling on `limit`; the configured maximum clamps further.
const MAX_LIMIT: usize = 1_000;

/// `page`/`limit` query parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number (default 1).
    pub page: Option<usize>,
    /// Items per page (default and maximum come from configuration).
    pub limit: Option<usize>,
}

impl Validate for PageQuery {
    fn validate(&self, v: &mut Validator) {
        validate_page(v, self.page, self.limit);
    }
}

/// Shared page/limit checks for list query structs.
pub fn validate_page(v: &mut Validator, page: Option<usize>, limit: Option<usize>) {
    v.optional_range("page", page, 1, MAX_PAGE);
    v.optional_range("limit", limit, 1, MAX_LIMIT);
}

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: usize,
    pub limit: usize,
}

impl PageParams {
    pub fn resolve(page: Option<usize>, limit: Option<usize>, config: &ServerConfig) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(config.default_page_size)
                .clamp(1, config.max_page_size.max(1)),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
    pub limit: usize,
}

impl<T> Paginated<T> {
    /// Slice one page out of the full, already-ordered result set.
    pub fn from_vec(all: Vec<T>, params: PageParams) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(params.offset())
            .take(params.limit)
            .collect();
        Self {
            items,
            total,
            page: params.page,
            pages: total.div_ceil(params.limit),
            limit: params.limit,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            pages: self.pages,
            limit: self.limit,
        }
    }
}
