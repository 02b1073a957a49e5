// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    #[default]
    General,
    Event,
    Session,
    Resource,
    Website,
    Suggestion,
    Complaint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    New,
    Reviewed,
    Resolved,
}

/// General feedback; `user_id` is absent for anonymous submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Feedback {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub feedback_type: FeedbackType,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub related_id: Option<String>,
    pub status: FeedbackStatus,
    #[serde(default)]
    pub admin_response: Option<String>,
    #[serde(default)]
    pub responded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(
        user_id: Option<String>,
        feedback_type: FeedbackType,
        subject: String,
        message: String,
        rating: Option<u8>,
        related_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id,
            feedback_type,
            subject,
            message,
            rating,
            related_id,
            status: FeedbackStatus::New,
            admin_response: None,
            responded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an admin response; the status defaults to resolved.
    pub fn respond(
        &mut self,
        admin_id: &str,
        response: String,
        status: Option<FeedbackStatus>,
        now: DateTime<Utc>,
    ) {
        self.admin_response = Some(response);
        self.responded_by = Some(admin_id.to_string());
        self.status = status.unwrap_or(FeedbackStatus::Resolved);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_feedback_starts_unreviewed() {
        let f = Feedback::new(None, FeedbackType::Website, "Broken link".into(), "The events page 404s".into(), None, None, Utc::now());
        assert_eq!(f.status, FeedbackStatus::New);
        assert!(f.user_id.is_none());
    }

    #[test]
    fn respond_resolves_by_default() {
        let mut f = Feedback::new(Some("u".into()), FeedbackType::Event, "Great".into(), "Loved it".into(), Some(5), None, Utc::now());
        f.respond("admin", "Thanks!".into(), None, Utc::now());
        assert_eq!(f.status, FeedbackStatus::Resolved);
        assert_eq!(f.responded_by.as_deref(), Some("admin"));

        f.respond("admin", "Following up".into(), Some(FeedbackStatus::Reviewed), Utc::now());
        assert_eq!(f.status, FeedbackStatus::Reviewed);
    }
}
