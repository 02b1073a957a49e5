// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-generated content under moderation: stories and galleries.
//!
//! ```text
//! draft -> pending_review -> approved -> published
//!   \            \              \
//!    +------------+--------------+--> rejected | archived   (absorbing)
//! ```
//!
//! `approve` moves straight to `published`. Likes and comments are only
//! accepted on published content; comments stay hidden until approved.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{new_id, HealthTopic};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    #[default]
    Draft,
    PendingReview,
    Approved,
    Published,
    Rejected,
    Archived,
}

impl ModerationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModerationStatus::Rejected | ModerationStatus::Archived)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReviewStamp {
    pub reviewer_id: String,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_approved: bool,
}

/// Shared moderation lifecycle for stories and galleries.
pub trait Moderated {
    fn status(&self) -> ModerationStatus;
    fn set_status(&mut self, status: ModerationStatus);
    fn set_review(&mut self, review: ReviewStamp);
    fn likes(&self) -> &BTreeSet<String>;
    fn likes_mut(&mut self) -> &mut BTreeSet<String>;
    fn comments(&self) -> &[Comment];
    fn comments_mut(&mut self) -> &mut Vec<Comment>;
    fn touch(&mut self, now: DateTime<Utc>);

    /// Extra stamping when content goes live.
    fn on_publish(&mut self, _now: DateTime<Utc>) {}

    fn ensure_editable(&self) -> ServiceResult<()> {
        if self.status() == ModerationStatus::Draft {
            Ok(())
        } else {
            Err(ServiceError::invalid("Only drafts can be edited"))
        }
    }

    fn submit(&mut self, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.status() != ModerationStatus::Draft {
            return Err(ServiceError::invalid(
                "Only drafts can be submitted for review",
            ));
        }
        self.set_status(ModerationStatus::PendingReview);
        self.touch(now);
        Ok(())
    }

    fn approve(
        &mut self,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        if !matches!(
            self.status(),
            ModerationStatus::PendingReview | ModerationStatus::Approved
        ) {
            return Err(ServiceError::invalid(
                "Only content pending review can be approved",
            ));
        }
        self.set_status(ModerationStatus::Published);
        self.set_review(ReviewStamp {
            reviewer_id: reviewer_id.to_string(),
            reviewed_at: now,
            notes,
        });
        self.on_publish(now);
        self.touch(now);
        Ok(())
    }

    fn reject(
        &mut self,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        if self.status().is_terminal() {
            return Err(ServiceError::invalid(
                "Content has already been rejected or archived",
            ));
        }
        self.set_status(ModerationStatus::Rejected);
        self.set_review(ReviewStamp {
            reviewer_id: reviewer_id.to_string(),
            reviewed_at: now,
            notes,
        });
        self.touch(now);
        Ok(())
    }

    fn archive(&mut self, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.status().is_terminal() {
            return Err(ServiceError::invalid(
                "Content has already been rejected or archived",
            ));
        }
        self.set_status(ModerationStatus::Archived);
        self.touch(now);
        Ok(())
    }

    /// Returns whether the user now likes the content.
    fn toggle_like(&mut self, user_id: &str) -> ServiceResult<bool> {
        if self.status() != ModerationStatus::Published {
            return Err(ServiceError::invalid("Only published content can be liked"));
        }
        let likes = self.likes_mut();
        if likes.remove(user_id) {
            Ok(false)
        } else {
            likes.insert(user_id.to_string());
            Ok(true)
        }
    }

    fn add_comment(
        &mut self,
        author_id: &str,
        text: String,
        now: DateTime<Utc>,
    ) -> ServiceResult<Comment> {
        if self.status() != ModerationStatus::Published {
            return Err(ServiceError::invalid(
                "Only published content can be commented on",
            ));
        }
        let comment = Comment {
            id: new_id(),
            author_id: author_id.to_string(),
            text,
            created_at: now,
            is_approved: false,
        };
        self.comments_mut().push(comment.clone());
        self.touch(now);
        Ok(comment)
    }

    fn approve_comment(&mut self, comment_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let comment = self
            .comments_mut()
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ServiceError::not_found("Comment not found"))?;
        comment.is_approved = true;
        self.touch(now);
        Ok(())
    }

    /// Allowed to the comment author or the content owner.
    fn remove_comment(
        &mut self,
        comment_id: &str,
        actor_id: &str,
        actor_owns_content: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let comments = self.comments_mut();
        let index = comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| ServiceError::not_found("Comment not found"))?;
        if comments[index].author_id != actor_id && !actor_owns_content {
            return Err(ServiceError::forbidden(
                "Only the comment author or content owner can delete this comment",
            ));
        }
        comments.remove(index);
        self.touch(now);
        Ok(())
    }

    /// Comments shown to the public.
    fn visible_comments(&self) -> Vec<Comment> {
        self.comments()
            .iter()
            .filter(|c| c.is_approved)
            .cloned()
            .collect()
    }

    fn pending_comments(&self) -> Vec<Comment> {
        self.comments()
            .iter()
            .filter(|c| !c.is_approved)
            .cloned()
            .collect()
    }
}

macro_rules! moderated_fields {
    () => {
        fn status(&self) -> ModerationStatus {
            self.status
        }

        fn set_status(&mut self, status: ModerationStatus) {
            self.status = status;
        }

        fn set_review(&mut self, review: ReviewStamp) {
            self.review = Some(review);
        }

        fn likes(&self) -> &BTreeSet<String> {
            &self.likes
        }

        fn likes_mut(&mut self) -> &mut BTreeSet<String> {
            &mut self.likes
        }

        fn comments(&self) -> &[Comment] {
            &self.comments
        }

        fn comments_mut(&mut self) -> &mut Vec<Comment> {
            &mut self.comments
        }

        fn touch(&mut self, now: DateTime<Utc>) {
            self.updated_at = now;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub author_id: String,
    pub category: HealthTopic,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub featured_image: Option<String>,
    pub status: ModerationStatus,
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub review: Option<ReviewStamp>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Moderated for Story {
    moderated_fields!();

    fn on_publish(&mut self, now: DateTime<Utc>) {
        self.published_at = Some(now);
    }
}

/// Audience of a content view; decides what is revealed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer<'a> {
    pub user_id: Option<&'a str>,
    /// Owner or moderator: sees author identity and pending comments.
    pub privileged: bool,
}

impl Story {
    pub fn view(&self, viewer: Viewer<'_>) -> StoryView {
        let reveal_author = !self.is_anonymous || viewer.privileged;
        StoryView {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            excerpt: self.excerpt.clone(),
            author_id: reveal_author.then(|| self.author_id.clone()),
            category: self.category,
            tags: self.tags.clone(),
            is_anonymous: self.is_anonymous,
            featured_image: self.featured_image.clone(),
            status: self.status,
            like_count: self.likes.len(),
            liked: viewer.user_id.is_some_and(|id| self.likes.contains(id)),
            comments: if viewer.privileged {
                self.comments.clone()
            } else {
                self.visible_comments()
            },
            review: viewer.privileged.then(|| self.review.clone()).flatten(),
            published_at: self.published_at,
            view_count: self.view_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoryView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    /// Hidden for anonymous stories unless the viewer is the owner or a moderator.
    pub author_id: Option<String>,
    pub category: HealthTopic,
    pub tags: Vec<String>,
    pub is_anonymous: bool,
    pub featured_image: Option<String>,
    pub status: ModerationStatus,
    pub like_count: usize,
    pub liked: bool,
    pub comments: Vec<Comment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewStamp>,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GalleryImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub images: Vec<GalleryImage>,
    /// Non-owning reference to an event.
    #[serde(default)]
    pub related_event: Option<String>,
    pub uploaded_by: String,
    pub status: ModerationStatus,
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub review: Option<ReviewStamp>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Moderated for Gallery {
    moderated_fields!();
}

impl Gallery {
    pub fn view(&self, viewer: Viewer<'_>) -> GalleryView {
        GalleryView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            images: self.images.clone(),
            related_event: self.related_event.clone(),
            uploaded_by: self.uploaded_by.clone(),
            status: self.status,
            like_count: self.likes.len(),
            liked: viewer.user_id.is_some_and(|id| self.likes.contains(id)),
            comments: if viewer.privileged {
                self.comments.clone()
            } else {
                self.visible_comments()
            },
            review: viewer.privileged.then(|| self.review.clone()).flatten(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GalleryView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub images: Vec<GalleryImage>,
    pub related_event: Option<String>,
    pub uploaded_by: String,
    pub status: ModerationStatus,
    pub like_count: usize,
    pub liked: bool,
    pub comments: Vec<Comment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewStamp>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
