// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-education sessions and their participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::HealthTopic;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub attended: bool,
    /// 0-100
    #[serde(default)]
    pub pre_test_score: Option<u8>,
    /// 0-100
    #[serde(default)]
    pub post_test_score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeerEducationSession {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub category: HealthTopic,
    #[serde(default)]
    pub facilitators: Vec<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub location: String,
    #[serde(default)]
    pub max_participants: Option<u32>,
    pub status: SessionStatus,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PeerEducationSession {
    pub fn is_facilitator(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.facilitators.iter().any(|f| f == user_id)
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    fn participant_mut(&mut self, user_id: &str) -> ServiceResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| ServiceError::not_found("Participant not found"))
    }

    /// Remaining places; `None` when uncapped.
    pub fn available_spots(&self) -> Option<u32> {
        self.max_participants
            .map(|m| m.saturating_sub(self.participants.len() as u32))
    }

    pub fn join(&mut self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        match self.status {
            SessionStatus::Cancelled => {
                return Err(ServiceError::invalid("Session has been cancelled"))
            }
            SessionStatus::Completed => {
                return Err(ServiceError::invalid("Session has already been completed"))
            }
            SessionStatus::Scheduled | SessionStatus::InProgress => {}
        }
        if self.available_spots() == Some(0) {
            return Err(ServiceError::invalid("Session is full"));
        }
        if self.participant(user_id).is_some() {
            return Err(ServiceError::invalid("You have already joined this session"));
        }
        if self.scheduled_at <= now {
            return Err(ServiceError::invalid("Session has already started"));
        }

        self.participants.push(Participant {
            user_id: user_id.to_string(),
            joined_at: now,
            attended: false,
            pre_test_score: None,
            post_test_score: None,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn leave(&mut self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let Some(index) = self.participants.iter().position(|p| p.user_id == user_id) else {
            return Err(ServiceError::invalid("You have not joined this session"));
        };
        if self.scheduled_at <= now {
            return Err(ServiceError::invalid("Session has already started"));
        }
        self.participants.remove(index);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_attendance(
        &mut self,
        user_id: &str,
        attended: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.participant_mut(user_id)?.attended = attended;
        self.updated_at = now;
        Ok(())
    }

    /// Only the scores given are overwritten.
    pub fn record_scores(
        &mut self,
        user_id: &str,
        pre: Option<u8>,
        post: Option<u8>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let participant = self.participant_mut(user_id)?;
        if pre.is_some() {
            participant.pre_test_score = pre;
        }
        if post.is_some() {
            participant.post_test_score = post;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Mean of `post - pre` over participants with both scores.
    pub fn average_improvement(&self) -> Option<f64> {
        let deltas: Vec<f64> = self
            .participants
            .iter()
            .filter_map(|p| match (p.pre_test_score, p.post_test_score) {
                (Some(pre), Some(post)) => Some(f64::from(post) - f64::from(pre)),
                _ => None,
            })
            .collect();
        if deltas.is_empty() {
            None
        } else {
            Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
        }
    }

    pub fn set_status(&mut self, status: SessionStatus, now: DateTime<Utc>) -> ServiceResult<()> {
        if matches!(self.status, SessionStatus::Cancelled | SessionStatus::Completed)
            && status != self.status
        {
            return Err(ServiceError::invalid(
                "Cancelled or completed sessions cannot change status",
            ));
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            participant_count: self.participants.len(),
            attended_count: self.participants.iter().filter(|p| p.attended).count(),
            available_spots: self.available_spots(),
            average_improvement: self.average_improvement(),
        }
    }
}

/// Derived participation figures for a session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SessionSummary {
    pub participant_count: usize,
    pub attended_count: usize,
    pub available_spots: Option<u32>,
    pub average_improvement: Option<f64>,
}
