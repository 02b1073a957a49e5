// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::authenticate,
    config::ServerConfig,
    error::ApiError,
    rate_limit::{rate_limit_middleware, RateLimiter},
    state::AppState,
    storage::StoragePaths,
};

pub mod admin;
pub mod auth;
pub mod content;
pub mod events;
pub mod feedback;
pub mod health;
pub mod library;
pub mod members;
pub mod people;
pub mod questions;
pub mod sessions;
pub mod settings;
pub mod uploads;

/// Multipart framing on top of the configured file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let config = state.config().clone();
    let limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_secs),
        config.rate_limit_max_requests,
    );

    // Every admin route needs a principal; tiers are checked per handler.
    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/reports/{kind}", get(admin::report))
        .route("/users", get(admin::list_users))
        .route("/users/{id}", get(admin::get_user).delete(admin::delete_user))
        .route("/users/{id}/roles", put(admin::set_roles))
        .route("/users/{id}/active", put(admin::set_active))
        .route("/audit", get(admin::query_audit))
        .route("/settings", get(admin::get_settings).put(admin::update_settings))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    let api_routes = Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route("/auth/password", put(auth::change_password))
        // Members
        .route("/members", get(members::list).post(members::create_profile))
        .route("/members/me", get(members::my_profile).put(members::update_profile))
        .route("/members/{id}", get(members::get))
        .route("/members/{id}/status", put(members::set_status))
        .route("/members/{id}/volunteer-hours", post(members::add_volunteer_hours))
        // Directories
        .route("/advisors", get(people::list_advisors).post(people::create_advisor))
        .route(
            "/advisors/{id}",
            get(people::get_advisor)
                .put(people::update_advisor)
                .delete(people::delete_advisor),
        )
        .route(
            "/peer-educators",
            get(people::list_peer_educators).post(people::create_peer_educator),
        )
        .route(
            "/peer-educators/{id}",
            get(people::get_peer_educator)
                .put(people::update_peer_educator)
                .delete(people::delete_peer_educator),
        )
        // Events
        .route("/events", get(events::list).post(events::create))
        .route("/events/mine", get(events::mine))
        .route(
            "/events/{id}",
            get(events::get).put(events::update).delete(events::delete),
        )
        .route(
            "/events/{id}/register",
            post(events::register).delete(events::unregister),
        )
        .route("/events/{id}/registrations", get(events::registrations))
        .route("/events/{id}/attendance/{user_id}", put(events::mark_attendance))
        .route("/events/{id}/feedback", post(events::submit_feedback))
        // Peer-education sessions
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/sessions/{id}", get(sessions::get).put(sessions::update))
        .route("/sessions/{id}/status", put(sessions::set_status))
        .route("/sessions/{id}/cancel", post(sessions::cancel))
        .route("/sessions/{id}/join", post(sessions::join).delete(sessions::leave))
        .route("/sessions/{id}/attendance/{user_id}", put(sessions::mark_attendance))
        .route("/sessions/{id}/scores/{user_id}", put(sessions::record_scores))
        // Resource library
        .route(
            "/resources",
            get(library::list_resources).post(library::create_resource),
        )
        .route("/resources/completions/mine", get(library::my_completions))
        .route(
            "/resources/{id}",
            get(library::get_resource)
                .put(library::update_resource)
                .delete(library::delete_resource),
        )
        .route("/resources/{id}/complete", post(library::complete_resource))
        .route("/resources/{id}/rate", post(library::rate_resource))
        // Training
        .route(
            "/training",
            get(library::list_training).post(library::create_training),
        )
        .route("/training/progress", get(library::progress))
        .route(
            "/training/{id}",
            get(library::get_training)
                .put(library::update_training)
                .delete(library::delete_training),
        )
        .route("/training/{id}/complete", post(library::complete_training))
        // Stories
        .route("/stories", get(content::list_stories).post(content::create_story))
        .route("/stories/mine", get(content::my_stories))
        .route("/stories/{id}", get(content::get_story).put(content::update_story))
        .route("/stories/{id}/submit", post(content::submit_story))
        .route("/stories/{id}/approve", post(content::approve_story))
        .route("/stories/{id}/reject", post(content::reject_story))
        .route("/stories/{id}/archive", post(content::archive_story))
        .route("/stories/{id}/like", post(content::like_story))
        .route("/stories/{id}/comments", post(content::comment_story))
        .route(
            "/stories/{id}/comments/{comment_id}",
            delete(content::delete_story_comment),
        )
        .route(
            "/stories/{id}/comments/{comment_id}/approve",
            post(content::approve_story_comment),
        )
        // Galleries
        .route(
            "/galleries",
            get(content::list_galleries).post(content::create_gallery),
        )
        .route("/galleries/mine", get(content::my_galleries))
        .route(
            "/galleries/{id}",
            get(content::get_gallery).put(content::update_gallery),
        )
        .route("/galleries/{id}/submit", post(content::submit_gallery))
        .route("/galleries/{id}/approve", post(content::approve_gallery))
        .route("/galleries/{id}/reject", post(content::reject_gallery))
        .route("/galleries/{id}/archive", post(content::archive_gallery))
        .route("/galleries/{id}/like", post(content::like_gallery))
        .route("/galleries/{id}/comments", post(content::comment_gallery))
        .route(
            "/galleries/{id}/comments/{comment_id}",
            delete(content::delete_gallery_comment),
        )
        .route(
            "/galleries/{id}/comments/{comment_id}/approve",
            post(content::approve_gallery_comment),
        )
        .route("/moderation/queue", get(content::queue))
        // Anonymous questions
        .route("/questions", get(questions::list).post(questions::submit))
        .route("/questions/queue", get(questions::queue))
        .route("/questions/{id}", get(questions::get))
        .route("/questions/{id}/helpful", post(questions::helpful))
        .route("/questions/{id}/moderate", put(questions::moderate))
        .route("/questions/{id}/answer", put(questions::answer))
        .route("/questions/{id}/verify", put(questions::verify))
        // Feedback
        .route("/feedback", get(feedback::list).post(feedback::submit))
        .route("/feedback/{id}", get(feedback::get))
        .route("/feedback/{id}/respond", put(feedback::respond))
        // Misc
        .route("/settings/public", get(settings::public))
        .route("/uploads", post(uploads::upload))
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(
            config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(from_fn_with_state(limiter, rate_limit_middleware));

    let uploads_dir = StoragePaths::new(&config.data_dir).uploads_dir();

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .fallback(|| async { ApiError::not_found("Route not found") })
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(&config)),
        )
}

/// `*` or an empty list allows any origin.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("x-request-id")]);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Registers the `bearer_auth` scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Health Advocacy Club API",
        description = "Membership, events, peer education, resources and moderated content."
    ),
    modifiers(&SecurityAddon),
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        auth::change_password,
        members::create_profile,
        members::my_profile,
        members::update_profile,
        members::list,
        members::get,
        members::set_status,
        members::add_volunteer_hours,
        people::list_advisors,
        people::get_advisor,
        people::create_advisor,
        people::update_advisor,
        people::delete_advisor,
        people::list_peer_educators,
        people::get_peer_educator,
        people::create_peer_educator,
        people::update_peer_educator,
        people::delete_peer_educator,
        events::list,
        events::get,
        events::create,
        events::update,
        events::delete,
        events::register,
        events::unregister,
        events::registrations,
        events::mark_attendance,
        events::submit_feedback,
        events::mine,
        sessions::list,
        sessions::get,
        sessions::create,
        sessions::update,
        sessions::set_status,
        sessions::cancel,
        sessions::join,
        sessions::leave,
        sessions::mark_attendance,
        sessions::record_scores,
        library::list_resources,
        library::get_resource,
        library::create_resource,
        library::update_resource,
        library::delete_resource,
        library::complete_resource,
        library::rate_resource,
        library::my_completions,
        library::list_training,
        library::get_training,
        library::create_training,
        library::update_training,
        library::delete_training,
        library::complete_training,
        library::progress,
        content::queue,
        content::list_stories,
        content::my_stories,
        content::get_story,
        content::create_story,
        content::update_story,
        content::submit_story,
        content::approve_story,
        content::reject_story,
        content::archive_story,
        content::like_story,
        content::comment_story,
        content::approve_story_comment,
        content::delete_story_comment,
        content::list_galleries,
        content::my_galleries,
        content::get_gallery,
        content::create_gallery,
        content::update_gallery,
        content::submit_gallery,
        content::approve_gallery,
        content::reject_gallery,
        content::archive_gallery,
        content::like_gallery,
        content::comment_gallery,
        content::approve_gallery_comment,
        content::delete_gallery_comment,
        questions::submit,
        questions::list,
        questions::get,
        questions::helpful,
        questions::queue,
        questions::moderate,
        questions::answer,
        questions::verify,
        feedback::submit,
        feedback::list,
        feedback::get,
        feedback::respond,
        settings::public,
        uploads::upload,
        admin::dashboard,
        admin::report,
        admin::list_users,
        admin::get_user,
        admin::set_roles,
        admin::set_active,
        admin::delete_user,
        admin::query_audit,
        admin::get_settings,
        admin::update_settings
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login and the caller's account"),
        (name = "Members", description = "Membership profiles"),
        (name = "People", description = "Advisor and peer-educator directories"),
        (name = "Events", description = "Events and registrations"),
        (name = "Sessions", description = "Peer-education sessions"),
        (name = "Resources", description = "Resource library"),
        (name = "Training", description = "Role-targeted training content"),
        (name = "Stories", description = "Member stories under moderation"),
        (name = "Galleries", description = "Photo galleries under moderation"),
        (name = "Moderation", description = "Moderator queue"),
        (name = "Questions", description = "Anonymous questions and answers"),
        (name = "Feedback", description = "General feedback"),
        (name = "Settings", description = "Public site settings"),
        (name = "Uploads", description = "File uploads"),
        (name = "Admin", description = "Administration (admin role required)")
    )
)]
pub struct ApiDoc;
