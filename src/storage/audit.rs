// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Authentication events, role and account changes, moderation decisions and
//! administrative writes are appended to a daily JSONL file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DocumentStorage, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account events
    UserRegistered,
    LoginSucceeded,
    LoginFailed,
    AccountLocked,
    PasswordChanged,

    // User administration
    RolesChanged,
    AccountStatusChanged,
    UserDeleted,
    MemberStatusChanged,

    // Events and sessions
    EventCreated,
    EventUpdated,
    EventDeleted,
    AttendanceMarked,
    SessionCreated,
    SessionCancelled,

    // Library
    ResourceCreated,
    ResourceDeleted,

    // Moderation
    ContentApproved,
    ContentRejected,
    ContentArchived,
    CommentApproved,
    QuestionModerated,
    QuestionAnswered,

    // Admin events
    AdminAccess,
    SettingsUpdated,
    FileUploaded,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (event id, story id, ...).
    pub resource_id: Option<String>,
    /// Resource type (event, story, ...).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> AuditRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    /// Append an event to its day's log.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);

        let line = serde_json::to_string(event).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize audit event: {e}"))
        })?;
        self.storage.append_line(&path, &line)
    }

    /// Events for one date (`YYYY-MM-DD`); empty when nothing was logged.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        if !self.storage.exists(&path) {
            return Ok(Vec::new());
        }
        let content = self.storage.read_raw(&path)?;

        let content = String::from_utf8(content).map_err(|e| {
            StorageError::SerializationError(format!("Invalid UTF-8 in audit log: {e}"))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    StorageError::SerializationError(format!(
                        "Failed to deserialize audit event: {e}"
                    ))
                })
            })
            .collect()
    }

    /// Events between two dates inclusive.
    pub fn read_events_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<AuditEvent>> {
        let mut all_events = Vec::new();
        let mut current = start;

        while current <= end {
            let date_str = current.format("%Y-%m-%d").to_string();
            all_events.extend(self.read_events(&date_str)?);
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::SerializationError("Date overflow".to_string()))?;
        }

        Ok(all_events)
    }
}

/// Helper macro for logging audit events. Logging failures are reported
/// through `tracing` and never fail the request.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event_type:expr, $user:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type).with_user(&$user.user_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($storage:expr, $event_type:expr, $user:expr, $resource_type:expr, $resource_id:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.user_id)
            .with_resource($resource_type, $resource_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::EventCreated)
            .with_user("user_123")
            .with_resource("event", "event_abc");

        assert_eq!(event.event_type, AuditEventType::EventCreated);
        assert_eq!(event.user_id, Some("user_123".to_string()));
        assert_eq!(event.resource_type, Some("event".to_string()));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::LoginFailed)
            .with_user("user_123")
            .failed("Invalid credentials");

        assert!(!event.success);
        assert_eq!(event.error, Some("Invalid credentials".to_string()));
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        repo.log(&AuditEvent::new(AuditEventType::ContentApproved).with_user("mod_1"))
            .unwrap();
        repo.log(&AuditEvent::new(AuditEventType::ContentRejected).with_user("mod_2"))
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = repo.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::ContentApproved);
        assert_eq!(events[1].event_type, AuditEventType::ContentRejected);
    }

    #[test]
    fn missing_day_reads_empty() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);
        assert!(repo.read_events("2001-01-01").unwrap().is_empty());
    }

    #[test]
    fn range_spans_days() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);
        let mut old = AuditEvent::new(AuditEventType::UserRegistered);
        old.timestamp = Utc::now() - chrono::Duration::days(2);
        repo.log(&old).unwrap();
        repo.log(&AuditEvent::new(AuditEventType::UserRegistered)).unwrap();

        let today = Utc::now().date_naive();
        let events = repo
            .read_events_range(today - chrono::Duration::days(3), today)
            .unwrap();
        assert_eq!(events.len(), 2);
    }
}
