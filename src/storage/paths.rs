// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the document store layout.

use std::path::{Path, PathBuf};

/// Default root directory of the document store.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Document Paths ==========

    /// Directory holding every document of one collection.
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// Path to a single document file.
    pub fn document(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    /// The system settings singleton.
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    // ========== Upload Paths ==========

    /// Files stored by the local upload backend.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn upload_file(&self, filename: &str) -> PathBuf {
        self.uploads_dir().join(filename)
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to the audit events file for a date.
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root() {
        assert_eq!(StoragePaths::default().root(), Path::new("./data"));
    }

    #[test]
    fn document_paths() {
        let paths = StoragePaths::new("/tmp/club");
        assert_eq!(
            paths.document("events", "abc"),
            PathBuf::from("/tmp/club/events/abc.json")
        );
        assert_eq!(paths.settings_file(), PathBuf::from("/tmp/club/settings.json"));
        assert_eq!(
            paths.audit_events_file("2026-01-02"),
            PathBuf::from("/tmp/club/audit/2026-01-02/events.jsonl")
        );
        assert_eq!(paths.upload_file("x.png"), PathBuf::from("/tmp/club/uploads/x.png"));
    }
}
