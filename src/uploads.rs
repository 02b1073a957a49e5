// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File upload backends.
//!
//! The backend is chosen once at startup: `remote` when `UPLOAD_REMOTE_URL`
//! is configured, `local` otherwise. Both return the same descriptor.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::ServerConfig,
    domain::new_id,
    error::{ServiceError, ServiceResult},
    storage::StoragePaths,
};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote upload failed: {0}")]
    Request(String),
}

impl From<UploadError> for ServiceError {
    fn from(e: UploadError) -> Self {
        ServiceError::Unexpected(e.to_string())
    }
}

/// Descriptor returned for every stored file.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub mimetype: String,
    pub size: usize,
    /// `local` or `remote`
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    token: Option<String>,
    public_base_url: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub enum UploadStore {
    Local {
        paths: StoragePaths,
        public_base_url: String,
    },
    Remote(RemoteStore),
}

impl UploadStore {
    pub fn from_config(config: &ServerConfig) -> Result<Self, UploadError> {
        let public_base_url = config.upload_public_base_url.clone();
        match &config.upload_remote_url {
            Some(base) => {
                let http = Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .map_err(|e| UploadError::Request(format!("failed to build HTTP client: {e}")))?;
                Ok(UploadStore::Remote(RemoteStore {
                    base_url: base.trim_end_matches('/').to_string(),
                    token: config.upload_remote_token.clone(),
                    public_base_url,
                    http,
                }))
            }
            None => Ok(UploadStore::Local {
                paths: StoragePaths::new(&config.data_dir),
                public_base_url,
            }),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            UploadStore::Local { .. } => "local",
            UploadStore::Remote(_) => "remote",
        }
    }

    pub async fn store(
        &self,
        original_name: Option<&str>,
        mimetype: &str,
        data: Vec<u8>,
    ) -> Result<UploadedFile, UploadError> {
        let filename = stored_filename(mimetype);
        let size = data.len();

        let url = match self {
            UploadStore::Local {
                paths,
                public_base_url,
            } => {
                tokio::fs::create_dir_all(paths.uploads_dir()).await?;
                tokio::fs::write(paths.upload_file(&filename), data).await?;
                format!("{public_base_url}/uploads/{filename}")
            }
            UploadStore::Remote(remote) => remote.put(&filename, mimetype, data).await?,
        };

        tracing::info!(
            filename = %filename,
            original = original_name.unwrap_or("-"),
            size,
            provider = self.provider(),
            "Stored upload"
        );

        Ok(UploadedFile {
            url,
            filename,
            mimetype: mimetype.to_string(),
            size,
            provider: self.provider().to_string(),
        })
    }
}

impl RemoteStore {
    async fn put(&self, filename: &str, mimetype: &str, data: Vec<u8>) -> Result<String, UploadError> {
        let target = format!("{}/{filename}", self.base_url);
        let mut request = self
            .http
            .put(&target)
            .header(reqwest::header::CONTENT_TYPE, mimetype)
            .body(data);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(UploadError::Request(format!(
                "HTTP {} from object store",
                response.status()
            )));
        }

        if self.public_base_url.is_empty() {
            Ok(target)
        } else {
            Ok(format!("{}/{filename}", self.public_base_url))
        }
    }
}

/// Reject files outside the MIME allowlist or over the size limit.
pub fn check_upload(mimetype: &str, size: usize, config: &ServerConfig) -> ServiceResult<()> {
    if size == 0 {
        return Err(ServiceError::field("file", "file is empty"));
    }
    if !config
        .allowed_upload_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mimetype))
    {
        return Err(ServiceError::field(
            "file",
            format!("file type {mimetype} is not allowed"),
        ));
    }
    if size > config.max_upload_bytes {
        return Err(ServiceError::field(
            "file",
            format!("file exceeds the {} byte limit", config.max_upload_bytes),
        ));
    }
    Ok(())
}

/// Extension for a validated MIME type. The client's filename never
/// chooses it, since `/uploads` serves by extension.
fn extension_for(mimetype: &str) -> Option<&'static str> {
    match mimetype.to_ascii_lowercase().as_str() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        "text/plain" => Some("txt"),
        "audio/mpeg" => Some("mp3"),
        "video/mp4" => Some("mp4"),
        _ => None,
    }
}

/// Random stored name with an extension derived from the MIME type.
fn stored_filename(mimetype: &str) -> String {
    match extension_for(mimetype) {
        Some(ext) => format!("{}.{ext}", new_id()),
        None => new_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn allowlist_and_size_are_enforced() {
        let config = ServerConfig {
            max_upload_bytes: 10,
            ..ServerConfig::default()
        };
        assert!(check_upload("image/png", 10, &config).is_ok());
        assert!(check_upload("IMAGE/PNG", 5, &config).is_ok());
        assert!(check_upload("application/x-msdownload", 5, &config).is_err());
        assert!(check_upload("image/png", 11, &config).is_err());
        assert!(check_upload("image/png", 0, &config).is_err());
    }

    #[test]
    fn stored_extension_follows_mime_type() {
        assert!(stored_filename("image/jpeg").ends_with(".jpg"));
        assert!(stored_filename("IMAGE/PNG").ends_with(".png"));
        assert!(stored_filename("application/pdf").ends_with(".pdf"));
        // Types without a known extension are stored bare.
        assert!(!stored_filename("text/html").contains('.'));
        assert!(!stored_filename("application/x-msdownload").contains('.'));
    }

    #[tokio::test]
    async fn client_filename_cannot_choose_the_extension() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let store = UploadStore::from_config(&config).unwrap();

        check_upload("image/png", 24, &config).unwrap();
        let file = store
            .store(Some("evil.html"), "image/png", b"<script>alert(1)</script>".to_vec())
            .await
            .unwrap();
        assert!(file.filename.ends_with(".png"));
        assert!(file.url.ends_with(".png"));
        assert!(!file.url.contains(".html"));
        assert!(temp.path().join("uploads").join(&file.filename).is_file());
    }

    #[tokio::test]
    async fn local_store_writes_under_uploads() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let store = UploadStore::from_config(&config).unwrap();
        assert_eq!(store.provider(), "local");

        let file = store
            .store(Some("poster.png"), "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(file.size, 3);
        assert_eq!(file.provider, "local");
        assert!(file.url.starts_with("/uploads/"));
        assert!(temp.path().join("uploads").join(&file.filename).is_file());
    }
}
