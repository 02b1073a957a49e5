// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for whole router subtrees.
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), authenticate));
//! ```
//!
//! Handlers behind it still use [`super::Auth`] or a tier extractor, which
//! pick up the attached principal without re-reading the store.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::{bearer_token, resolve_principal};
use crate::state::AppState;

/// Resolve the bearer token and attach the principal to the request.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let principal = match bearer_token(request.headers()).and_then(|token| resolve_principal(&state, token)) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Rejected unauthenticated request");
            return e.into_response();
        }
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::state::tests::test_state;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(user): Extension<AuthenticatedUser>| async move { user.user_id }),
            )
            .route_layer(from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let (state, _temp) = test_state();
        let response = app(state)
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let (state, _temp) = test_state();
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", "Bearer a.b.c")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
