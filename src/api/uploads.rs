// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File uploads for story images, gallery photos and resource attachments.

use axum::extract::{Multipart, State};

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    models::{ApiResponse, Created},
    state::AppState,
    storage::AuditEventType,
    uploads::{check_upload, UploadedFile},
    validation::FieldError,
};

fn file_error(message: impl Into<String>) -> ApiError {
    ApiError::validation(vec![FieldError::new("file", message)])
}

/// Upload a single file in the multipart field `file`.
///
/// The MIME type must be on the configured allowlist and the body within
/// the size limit.
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Uploads",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "Form with a single `file` field"),
    responses(
        (status = 201, description = "File stored", body = ApiResponse<UploadedFile>),
        (status = 400, description = "Missing file, disallowed type or too large"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    Auth(user): Auth,
    mut multipart: Multipart,
) -> Result<Created<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| file_error(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();
        let data = field
            .bytes()
            .await
            .map_err(|e| file_error(format!("Failed to read file: {e}")))?;

        check_upload(&mimetype, data.len(), state.config())?;
        let stored = state
            .uploads()
            .store(original_name.as_deref(), &mimetype, data.to_vec())
            .await
            .map_err(crate::error::ServiceError::from)?;

        audit_log!(state.storage(), AuditEventType::FileUploaded, user, "upload", &stored.filename);
        return Ok(ApiResponse::created(stored));
    }

    Err(file_error("Missing 'file' field in multipart form"))
}
