// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The settings singleton, stored at the data root.

use super::super::{DocumentStorage, StorageResult};
use crate::domain::SystemSettings;

pub struct SettingsRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    /// Stored settings, or defaults when none have been saved.
    pub fn load(&self) -> StorageResult<SystemSettings> {
        let path = self.storage.paths().settings_file();
        if !self.storage.exists(&path) {
            return Ok(SystemSettings::default());
        }
        self.storage.read_json(path)
    }

    pub fn save(&self, settings: &SystemSettings) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().settings_file(), settings)
    }
}
