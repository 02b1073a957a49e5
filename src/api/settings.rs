// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::extract::State;

use crate::{
    models::{ApiJson, ApiResponse},
    services::settings::{self, PublicSettings},
    state::AppState,
};

/// Site name, contact details and enabled features for the public site.
#[utoipa::path(
    get,
    path = "/api/settings/public",
    tag = "Settings",
    responses(
        (status = 200, description = "Public settings", body = ApiResponse<PublicSettings>)
    )
)]
pub async fn public(State(state): State<AppState>) -> ApiJson<PublicSettings> {
    ApiResponse::ok(settings::public(&state).await)
}
