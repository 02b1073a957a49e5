// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource library and training content, with per-user completion tracking.
//!
//! Both entity types embed their completions and share the upsert logic
//! through [`CompletionTracked`]: a user has at most one completion record
//! per item, and marking an item complete again overwrites that record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::HealthTopic;
use crate::auth::{Role, RoleSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Completion {
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub time_spent_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Optional details supplied when marking an item complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionInput {
    pub time_spent_minutes: Option<u32>,
    pub feedback: Option<String>,
}

/// Items that record which users completed them.
pub trait CompletionTracked {
    fn completions(&self) -> &[Completion];
    fn completions_mut(&mut self) -> &mut Vec<Completion>;
    fn touch(&mut self, now: DateTime<Utc>);

    /// Upsert keyed by user. Bumps the item's `updated_at`.
    fn mark_completed(&mut self, user_id: &str, input: CompletionInput, now: DateTime<Utc>) {
        self.touch(now);
        let completions = self.completions_mut();
        match completions.iter_mut().find(|c| c.user_id == user_id) {
            Some(existing) => {
                existing.completed_at = now;
                existing.time_spent_minutes = input.time_spent_minutes;
                existing.feedback = input.feedback;
            }
            None => completions.push(Completion {
                user_id: user_id.to_string(),
                completed_at: now,
                time_spent_minutes: input.time_spent_minutes,
                feedback: input.feedback,
            }),
        }
    }

    fn completion_for(&self, user_id: &str) -> Option<&Completion> {
        self.completions().iter().find(|c| c.user_id == user_id)
    }

    fn is_completed_by(&self, user_id: &str) -> bool {
        self.completion_for(user_id).is_some()
    }

    fn completion_count(&self) -> usize {
        self.completions().len()
    }
}

/// Reverse scan: every item the user has completed.
pub fn user_completions<'a, T: CompletionTracked>(items: &'a [T], user_id: &str) -> Vec<&'a T> {
    items.iter().filter(|i| i.is_completed_by(user_id)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Article,
    Video,
    Pdf,
    Infographic,
    Link,
    Audio,
    Other,
}

/// Who may read a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Public,
    Members,
    PeerEducators,
    Admin,
}

const PEER_EDUCATOR_READERS: &[Role] = &[Role::PeerEducator, Role::Admin, Role::Superadmin];

impl AccessLevel {
    /// `viewer` is `None` for anonymous requests.
    pub fn permits(&self, viewer: Option<&RoleSet>) -> bool {
        match (self, viewer) {
            (AccessLevel::Public, _) => true,
            (_, None) => false,
            (AccessLevel::Members, Some(_)) => true,
            (AccessLevel::PeerEducators, Some(roles)) => roles.intersects(PEER_EDUCATOR_READERS),
            (AccessLevel::Admin, Some(roles)) => roles.is_admin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub user_id: String,
    /// 1-5
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub category: HealthTopic,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub external_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub completions: Vec<Completion>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompletionTracked for Resource {
    fn completions(&self) -> &[Completion] {
        &self.completions
    }

    fn completions_mut(&mut self) -> &mut Vec<Completion> {
        &mut self.completions
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Resource {
    /// One rating per user; rating again replaces it.
    pub fn rate(&mut self, user_id: &str, score: u8, comment: Option<String>, now: DateTime<Utc>) {
        match self.ratings.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => {
                existing.score = score;
                existing.comment = comment;
                existing.rated_at = now;
            }
            None => self.ratings.push(Rating {
                user_id: user_id.to_string(),
                score,
                comment,
                rated_at: now,
            }),
        }
        self.updated_at = now;
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let total: u32 = self.ratings.iter().map(|r| u32::from(r.score)).sum();
        Some(f64::from(total) / self.ratings.len() as f64)
    }

    pub fn record_view(&mut self) {
        self.view_count = self.view_count.saturating_add(1);
    }

    pub fn view(&self, viewer: Option<&str>) -> ResourceView {
        ResourceView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            resource_type: self.resource_type,
            category: self.category,
            access_level: self.access_level,
            url: self.url.clone(),
            external_link: self.external_link.clone(),
            tags: self.tags.clone(),
            author: self.author.clone(),
            is_published: self.is_published,
            view_count: self.view_count,
            completion_count: self.completion_count(),
            average_rating: self.average_rating(),
            rating_count: self.ratings.len(),
            completed: viewer.is_some_and(|id| self.is_completed_by(id)),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public representation of a [`Resource`] without the embedded lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResourceView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub category: HealthTopic,
    pub access_level: AccessLevel,
    pub url: Option<String>,
    pub external_link: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub is_published: bool,
    pub view_count: u64,
    pub completion_count: usize,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
    /// Whether the requesting principal completed it.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrainingContentType {
    #[default]
    Module,
    Video,
    Quiz,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingContent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content_type: TrainingContentType,
    /// Empty means everyone.
    #[serde(default)]
    pub target_roles: Vec<Role>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub sequence: u32,
    pub is_required: bool,
    pub url: String,
    pub is_published: bool,
    #[serde(default)]
    pub completions: Vec<Completion>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompletionTracked for TrainingContent {
    fn completions(&self) -> &[Completion] {
        &self.completions
    }

    fn completions_mut(&mut self) -> &mut Vec<Completion> {
        &mut self.completions
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl TrainingContent {
    pub fn targets(&self, roles: &RoleSet) -> bool {
        self.target_roles.is_empty() || roles.is_admin() || roles.intersects(&self.target_roles)
    }

    pub fn view(&self, viewer: Option<&str>) -> TrainingView {
        TrainingView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            content_type: self.content_type,
            target_roles: self.target_roles.clone(),
            duration_minutes: self.duration_minutes,
            sequence: self.sequence,
            is_required: self.is_required,
            url: self.url.clone(),
            is_published: self.is_published,
            completion_count: self.completion_count(),
            completed: viewer.is_some_and(|id| self.is_completed_by(id)),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrainingView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content_type: TrainingContentType,
    pub target_roles: Vec<Role>,
    pub duration_minutes: Option<u32>,
    pub sequence: u32,
    pub is_required: bool,
    pub url: String,
    pub is_published: bool,
    pub completion_count: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A principal's progress through the training items targeted at them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrainingProgress {
    pub total: usize,
    pub completed: usize,
    pub required_total: usize,
    pub required_completed: usize,
    /// Required items completed, as a percentage; 100 when nothing is required.
    pub percent_required: f64,
}

pub fn training_progress(items: &[TrainingContent], user_id: &str, roles: &RoleSet) -> TrainingProgress {
    let targeted: Vec<&TrainingContent> = items
        .iter()
        .filter(|i| i.is_published && i.targets(roles))
        .collect();
    let required: Vec<&&TrainingContent> = targeted.iter().filter(|i| i.is_required).collect();
    let required_completed = required.iter().filter(|i| i.is_completed_by(user_id)).count();

    TrainingProgress {
        total: targeted.len(),
        completed: targeted.iter().filter(|i| i.is_completed_by(user_id)).count(),
        required_total: required.len(),
        required_completed,
        percent_required: if required.is_empty() {
            100.0
        } else {
            required_completed as f64 * 100.0 / required.len() as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(access_level: AccessLevel) -> Resource {
        let now = Utc::now();
        Resource {
            id: super::super::new_id(),
            title: "Sleep hygiene".into(),
            description: "Ten habits for better sleep".into(),
            resource_type: ResourceType::Article,
            category: HealthTopic::GeneralWellness,
            access_level,
            url: Some("https://example.org/sleep".into()),
            external_link: None,
            tags: vec![],
            author: None,
            is_published: true,
            view_count: 0,
            completions: vec![],
            ratings: vec![],
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn training(required: bool, target_roles: Vec<Role>) -> TrainingContent {
        let now = Utc::now();
        TrainingContent {
            id: super::super::new_id(),
            title: "Module".into(),
            description: "d".into(),
            content_type: TrainingContentType::Module,
            target_roles,
            duration_minutes: None,
            sequence: 1,
            is_required: required,
            url: "https://example.org/m".into(),
            is_published: true,
            completions: vec![],
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mark_completed_twice_keeps_one_record_with_latest_feedback() {
        let mut r = resource(AccessLevel::Public);
        let now = Utc::now();
        r.mark_completed(
            "u1",
            CompletionInput {
                time_spent_minutes: Some(5),
                feedback: Some("first".into()),
            },
            now,
        );
        r.mark_completed(
            "u1",
            CompletionInput {
                time_spent_minutes: Some(9),
                feedback: Some("second".into()),
            },
            now,
        );

        assert_eq!(r.completions.len(), 1);
        let c = r.completion_for("u1").unwrap();
        assert_eq!(c.feedback.as_deref(), Some("second"));
        assert_eq!(c.time_spent_minutes, Some(9));
        assert!(r.is_completed_by("u1"));
        assert!(!r.is_completed_by("u2"));
    }

    #[test]
    fn completion_bumps_updated_at_for_both_kinds() {
        let later = Utc::now() + chrono::Duration::minutes(5);
        let mut r = resource(AccessLevel::Public);
        let mut t = training(true, vec![]);
        r.mark_completed("u", CompletionInput::default(), later);
        t.mark_completed("u", CompletionInput::default(), later);
        assert_eq!(r.updated_at, later);
        assert_eq!(t.updated_at, later);
    }

    #[test]
    fn user_completions_scans_all_items() {
        let mut a = resource(AccessLevel::Public);
        let b = resource(AccessLevel::Public);
        let mut c = resource(AccessLevel::Public);
        a.mark_completed("u", CompletionInput::default(), Utc::now());
        c.mark_completed("u", CompletionInput::default(), Utc::now());
        let items = vec![a.clone(), b, c.clone()];

        let done: Vec<&str> = user_completions(&items, "u").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(done, vec![a.id.as_str(), c.id.as_str()]);
    }

    #[test]
    fn rating_is_upserted() {
        let mut r = resource(AccessLevel::Public);
        let now = Utc::now();
        r.rate("u1", 2, None, now);
        r.rate("u1", 4, None, now);
        r.rate("u2", 5, None, now);
        assert_eq!(r.ratings.len(), 2);
        assert_eq!(r.average_rating(), Some(4.5));
    }

    #[test]
    fn access_levels() {
        let member = RoleSet::from_roles([Role::Member]);
        let pe = RoleSet::from_roles([Role::Member, Role::PeerEducator]);
        let admin = RoleSet::from_roles([Role::Admin]);

        assert!(AccessLevel::Public.permits(None));
        assert!(!AccessLevel::Members.permits(None));
        assert!(AccessLevel::Members.permits(Some(&member)));
        assert!(!AccessLevel::PeerEducators.permits(Some(&member)));
        assert!(AccessLevel::PeerEducators.permits(Some(&pe)));
        assert!(AccessLevel::PeerEducators.permits(Some(&admin)));
        assert!(!AccessLevel::Admin.permits(Some(&pe)));
        assert!(AccessLevel::Admin.permits(Some(&admin)));
    }

    #[test]
    fn training_progress_counts_targeted_required_items() {
        let roles = RoleSet::from_roles([Role::Member, Role::PeerEducator]);
        let mut required_pe = training(true, vec![Role::PeerEducator]);
        let required_all = training(true, vec![]);
        let optional = training(false, vec![]);
        let advisor_only = training(true, vec![Role::Advisor]);
        required_pe.mark_completed("u", CompletionInput::default(), Utc::now());

        let items = vec![required_pe, required_all, optional, advisor_only];
        let progress = training_progress(&items, "u", &roles);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.required_total, 2);
        assert_eq!(progress.required_completed, 1);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percent_required, 50.0);
    }
}
