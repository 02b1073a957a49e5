// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Entities
//!
//! Entity records, their invariants and derived attributes, and the guarded
//! state transitions of each workflow. Nothing in this module performs I/O:
//! services load a document, call a transition here, and persist the result.
//!
//! - `people` - users, member profiles, advisors, peer educators
//! - `events` - event registration state machine
//! - `sessions` - peer-education session participation
//! - `content` - resource library and training content completion tracking
//! - `moderation` - story/gallery approval workflow, likes and comments
//! - `questions` - anonymous Q&A lifecycle
//! - `feedback` - general feedback submissions
//! - `settings` - the system settings singleton

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod content;
pub mod events;
pub mod feedback;
pub mod moderation;
pub mod people;
pub mod questions;
pub mod sessions;
pub mod settings;

pub use content::{
    training_progress, user_completions, AccessLevel, Completion, CompletionInput,
    CompletionTracked, Rating, Resource, ResourceType, ResourceView, TrainingContent,
    TrainingContentType, TrainingProgress, TrainingView,
};
pub use events::{
    Event, EventStatus, EventType, EventView, Registration, RegistrationFeedback,
    RegistrationStatus,
};
pub use feedback::{Feedback, FeedbackStatus, FeedbackType};
pub use moderation::{
    Comment, Gallery, GalleryImage, GalleryView, Moderated, ModerationStatus, ReviewStamp, Story,
    StoryView, Viewer,
};
pub use people::{
    normalize_email, normalize_username, Advisor, EmergencyContact, MembershipStatus, Member,
    NewUser, PeerEducator, PeerEducatorStatus, User, UserProfile,
};
pub use questions::{AnonymousQuestion, Answer, QuestionCategory, QuestionStatus};
pub use sessions::{Participant, PeerEducationSession, SessionStatus, SessionSummary};
pub use settings::{Feature, FeatureToggles, SecuritySettings, SystemSettings};

/// Fresh document identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Health topic shared by events, sessions, resources and stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthTopic {
    MentalHealth,
    SexualHealth,
    Nutrition,
    Fitness,
    SubstanceAbuse,
    GeneralWellness,
    #[default]
    Other,
}

impl HealthTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTopic::MentalHealth => "mental_health",
            HealthTopic::SexualHealth => "sexual_health",
            HealthTopic::Nutrition => "nutrition",
            HealthTopic::Fitness => "fitness",
            HealthTopic::SubstanceAbuse => "substance_abuse",
            HealthTopic::GeneralWellness => "general_wellness",
            HealthTopic::Other => "other",
        }
    }
}

/// Trim and drop blank entries from a list of free-form tags.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tags_normalizes_and_dedupes() {
        let tags = clean_tags(vec![" Stress ".into(), "".into(), "stress".into(), "sleep".into()]);
        assert_eq!(tags, vec!["sleep".to_string(), "stress".to_string()]);
    }

    #[test]
    fn topic_default_is_other() {
        assert_eq!(HealthTopic::default(), HealthTopic::Other);
        assert_eq!(HealthTopic::MentalHealth.as_str(), "mental_health");
    }
}
