// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anonymous questions. No submitter identity is ever stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum QuestionCategory {
    #[serde(rename = "Sexual Health")]
    SexualHealth,
    #[serde(rename = "Mental Health")]
    MentalHealth,
    #[serde(rename = "Substance Use")]
    SubstanceUse,
    #[serde(rename = "Nutrition")]
    Nutrition,
    #[serde(rename = "Relationships")]
    Relationships,
    #[serde(rename = "General Health")]
    GeneralHealth,
    #[default]
    #[serde(rename = "Other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    #[default]
    Pending,
    Approved,
    Answered,
    Rejected,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Answer {
    pub responder_id: String,
    pub text: String,
    pub answered_at: DateTime<Utc>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnonymousQuestion {
    pub id: String,
    pub question: String,
    pub category: QuestionCategory,
    pub status: QuestionStatus,
    #[serde(default)]
    pub answer: Option<Answer>,
    #[serde(default)]
    pub helpful: u32,
    #[serde(default)]
    pub not_helpful: u32,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_public() -> bool {
    true
}

impl AnonymousQuestion {
    pub fn new(
        question: String,
        category: QuestionCategory,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            question,
            category,
            status: QuestionStatus::Pending,
            answer: None,
            helpful: 0,
            not_helpful: 0,
            is_public: true,
            tags,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Rejected or archived.
    pub fn is_closed(&self) -> bool {
        matches!(self.status, QuestionStatus::Rejected | QuestionStatus::Archived)
    }

    /// Shown on the public board.
    pub fn is_publicly_visible(&self) -> bool {
        self.is_public && self.status == QuestionStatus::Answered
    }

    /// Moderator decision: approve, reject or archive.
    pub fn moderate(&mut self, status: QuestionStatus, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.is_closed() {
            return Err(ServiceError::invalid("Question has already been closed"));
        }
        match status {
            QuestionStatus::Approved if self.status == QuestionStatus::Answered => {
                return Err(ServiceError::invalid(
                    "Answered questions cannot return to approval",
                ));
            }
            QuestionStatus::Approved | QuestionStatus::Rejected | QuestionStatus::Archived => {}
            QuestionStatus::Pending | QuestionStatus::Answered => {
                return Err(ServiceError::field(
                    "status",
                    "status must be one of approved, rejected, archived",
                ));
            }
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    /// Answering again replaces the answer and clears verification.
    pub fn answer(&mut self, responder_id: &str, text: String, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.is_closed() {
            return Err(ServiceError::invalid("Closed questions cannot be answered"));
        }
        self.answer = Some(Answer {
            responder_id: responder_id.to_string(),
            text,
            answered_at: now,
            is_verified: false,
            verified_by: None,
        });
        self.status = QuestionStatus::Answered;
        self.updated_at = now;
        Ok(())
    }

    pub fn verify(&mut self, verifier_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let answer = self
            .answer
            .as_mut()
            .ok_or_else(|| ServiceError::invalid("Question has not been answered yet"))?;
        answer.is_verified = true;
        answer.verified_by = Some(verifier_id.to_string());
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_helpful(&mut self, helpful: bool, now: DateTime<Utc>) {
        if helpful {
            self.helpful = self.helpful.saturating_add(1);
        } else {
            self.not_helpful = self.not_helpful.saturating_add(1);
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_category_then_helpful() {
        let now = Utc::now();
        let category: QuestionCategory = serde_json::from_str(r#""Other""#).unwrap();
        let mut q = AnonymousQuestion::new("Is it normal to feel anxious?".into(), category, vec![], now);

        assert_eq!(q.category, QuestionCategory::Other);
        assert_eq!(q.status, QuestionStatus::Pending);
        assert_eq!((q.helpful, q.not_helpful), (0, 0));

        q.mark_helpful(true, now);
        assert_eq!(q.helpful, 1);
        assert_eq!(q.not_helpful, 0);
    }

    #[test]
    fn categories_serialize_as_labels() {
        assert_eq!(
            serde_json::to_string(&QuestionCategory::SubstanceUse).unwrap(),
            r#""Substance Use""#
        );
        assert!(serde_json::from_str::<QuestionCategory>(r#""other""#).is_err());
    }

    #[test]
    fn answer_then_verify() {
        let now = Utc::now();
        let mut q = AnonymousQuestion::new("How much sleep do I need?".into(), QuestionCategory::GeneralHealth, vec![], now);
        assert!(q.verify("advisor", now).is_err());

        q.answer("pe_1", "Seven to nine hours.".into(), now).unwrap();
        assert_eq!(q.status, QuestionStatus::Answered);
        assert!(q.is_publicly_visible());

        q.verify("advisor", now).unwrap();
        assert!(q.answer.as_ref().unwrap().is_verified);

        q.answer("pe_2", "Usually 7-9 hours.".into(), now).unwrap();
        assert!(!q.answer.as_ref().unwrap().is_verified);
    }

    #[test]
    fn moderation_transitions() {
        let now = Utc::now();
        let mut q = AnonymousQuestion::new("Where can I get tested?".into(), QuestionCategory::SexualHealth, vec![], now);
        q.moderate(QuestionStatus::Approved, now).unwrap();
        assert!(q.moderate(QuestionStatus::Pending, now).is_err());

        q.answer("a", "At the campus clinic.".into(), now).unwrap();
        assert!(q.moderate(QuestionStatus::Approved, now).is_err());

        q.moderate(QuestionStatus::Archived, now).unwrap();
        assert!(q.answer("a", "x".into(), now).is_err());
        assert!(q.moderate(QuestionStatus::Rejected, now).is_err());
    }
}
