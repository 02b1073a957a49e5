// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state handed to every handler.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::{
    auth::tokens::TokenIssuer,
    config::ServerConfig,
    domain::SystemSettings,
    storage::{DocumentStorage, SettingsRepository, StorageResult},
    uploads::{UploadError, UploadStore},
};

#[derive(Clone)]
pub struct AppState {
    storage: Arc<DocumentStorage>,
    tokens: TokenIssuer,
    config: Arc<ServerConfig>,
    settings: Arc<RwLock<SystemSettings>>,
    /// Serializes every read-modify-write against the store.
    write_gate: Arc<Mutex<()>>,
    uploads: Arc<UploadStore>,
}

impl AppState {
    /// Build state over an initialized store, loading the settings singleton.
    pub fn new(storage: DocumentStorage, config: ServerConfig) -> Result<Self, StateError> {
        let settings = SettingsRepository::new(&storage).load()?;
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.jwt_expiry_hours);
        let uploads = UploadStore::from_config(&config)?;

        Ok(Self {
            storage: Arc::new(storage),
            tokens,
            config: Arc::new(config),
            settings: Arc::new(RwLock::new(settings)),
            write_gate: Arc::new(Mutex::new(())),
            uploads: Arc::new(uploads),
        })
    }

    pub fn storage(&self) -> &DocumentStorage {
        &self.storage
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Hold for the whole of a load-check-save sequence.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Snapshot of the current system settings.
    pub async fn settings(&self) -> SystemSettings {
        self.settings.read().await.clone()
    }

    /// Persist and publish new settings. Caller holds the write gate.
    pub async fn replace_settings(&self, settings: SystemSettings) -> StorageResult<()> {
        SettingsRepository::new(&self.storage).save(&settings)?;
        *self.settings.write().await = settings;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to load settings: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Uploads(#[from] UploadError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    /// Fresh state over a temporary store.
    pub(crate) fn test_state() -> (AppState, TempDir) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().expect("Failed to initialize storage");
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let state = AppState::new(storage, config).expect("Failed to build state");
        (state, temp)
    }

    #[tokio::test]
    async fn settings_default_until_replaced() {
        let (state, _temp) = test_state();
        let mut settings = state.settings().await;
        assert!(settings.features.anonymous_questions);

        settings.site_name = "Wellness Club".into();
        state.replace_settings(settings).await.unwrap();
        assert_eq!(state.settings().await.site_name, "Wellness Club");

        let reloaded = SettingsRepository::new(state.storage()).load().unwrap();
        assert_eq!(reloaded.site_name, "Wellness Club");
    }
}
