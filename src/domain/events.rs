// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Events and the per-user registration state machine.
//!
//! ```text
//! unregistered --register--> registered --mark_attendance--> attended
//!       ^                        |
//!       +-------unregister-------+
//! ```
//!
//! Guards on `register` run in a fixed order so the caller always sees the
//! first reason that applies. `registration_status` and `available_slots`
//! are derived from the clock and the registration count on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::HealthTopic;
use crate::error::{ServiceError, ServiceResult};
use crate::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Workshop,
    Seminar,
    Campaign,
    HealthScreening,
    Social,
    Training,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    #[default]
    Published,
    Cancelled,
    Completed,
}

/// Derived registration state of an event at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    NotOpen,
    Closed,
    Full,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationFeedback {
    /// 1-5
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    pub user_id: String,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub attended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<RegistrationFeedback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub category: HealthTopic,
    pub status: EventStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_required: bool,
    pub registration_open_date: DateTime<Utc>,
    pub registration_close_date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    pub allow_cancellation: bool,
    #[serde(default)]
    pub organizers: Vec<String>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Date-window and capacity invariants, reported together.
    pub fn check_schedule(&self) -> ServiceResult<()> {
        let mut errors = Vec::new();
        if self.end_date < self.start_date {
            errors.push(FieldError::new(
                "end_date",
                "end_date must be on or after start_date",
            ));
        }
        if self.registration_close_date < self.registration_open_date {
            errors.push(FieldError::new(
                "registration_close_date",
                "registration_close_date must be on or after registration_open_date",
            ));
        }
        if self.registration_close_date > self.start_date {
            errors.push(FieldError::new(
                "registration_close_date",
                "registration_close_date must be on or before start_date",
            ));
        }
        if let Some(capacity) = self.capacity {
            if (capacity as usize) < self.registrations.len() {
                errors.push(FieldError::new(
                    "capacity",
                    "capacity cannot be lower than the current number of registrations",
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(errors))
        }
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// Remaining places; `None` when uncapped.
    pub fn available_slots(&self) -> Option<u32> {
        self.capacity
            .map(|c| c.saturating_sub(self.registrations.len() as u32))
    }

    pub fn is_full(&self) -> bool {
        self.available_slots() == Some(0)
    }

    pub fn registration_status(&self, now: DateTime<Utc>) -> RegistrationStatus {
        if now < self.registration_open_date {
            RegistrationStatus::NotOpen
        } else if now > self.registration_close_date {
            RegistrationStatus::Closed
        } else if self.is_full() {
            RegistrationStatus::Full
        } else {
            RegistrationStatus::Open
        }
    }

    pub fn registration_for(&self, user_id: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.user_id == user_id)
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.registration_for(user_id).is_some()
    }

    pub fn is_organizer(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.organizers.iter().any(|o| o == user_id)
    }

    pub fn register(&mut self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.status == EventStatus::Cancelled {
            return Err(ServiceError::invalid("Event has been cancelled"));
        }
        if !self.registration_required {
            return Err(ServiceError::invalid(
                "Registration is not required for this event",
            ));
        }
        if now < self.registration_open_date {
            return Err(ServiceError::invalid("Registration has not opened yet"));
        }
        if now > self.registration_close_date {
            return Err(ServiceError::invalid("Registration is closed"));
        }
        if self.is_full() {
            return Err(ServiceError::invalid("Event is full"));
        }
        if self.is_registered(user_id) {
            return Err(ServiceError::invalid(
                "You are already registered for this event",
            ));
        }
        if self.start_date <= now {
            return Err(ServiceError::invalid("Event has already started"));
        }

        self.registrations.push(Registration {
            user_id: user_id.to_string(),
            registered_at: now,
            attended: false,
            feedback: None,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn unregister(&mut self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let Some(index) = self.registrations.iter().position(|r| r.user_id == user_id) else {
            return Err(ServiceError::invalid("You are not registered for this event"));
        };
        if !self.allow_cancellation {
            return Err(ServiceError::invalid(
                "Cancellation is not allowed for this event",
            ));
        }
        if now > self.registration_close_date {
            return Err(ServiceError::invalid(
                "Registration is closed; cancellation is no longer possible",
            ));
        }

        self.registrations.remove(index);
        self.updated_at = now;
        Ok(())
    }

    /// Administrative; independent of the registration window.
    pub fn mark_attendance(
        &mut self,
        user_id: &str,
        attended: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let registration = self
            .registrations
            .iter_mut()
            .find(|r| r.user_id == user_id)
            .ok_or_else(|| ServiceError::not_found("Registration not found"))?;
        registration.attended = attended;
        self.updated_at = now;
        Ok(())
    }

    /// Attendees only; a second submission replaces the first.
    pub fn submit_feedback(
        &mut self,
        user_id: &str,
        rating: u8,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let registration = self
            .registrations
            .iter_mut()
            .find(|r| r.user_id == user_id)
            .ok_or_else(|| ServiceError::invalid("You are not registered for this event"))?;
        if !registration.attended {
            return Err(ServiceError::invalid("Only attendees can leave feedback"));
        }
        registration.feedback = Some(RegistrationFeedback {
            rating,
            comment,
            submitted_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Average feedback rating over attendees who left one.
    pub fn average_rating(&self) -> Option<f64> {
        let ratings: Vec<f64> = self
            .registrations
            .iter()
            .filter_map(|r| r.feedback.as_ref().map(|f| f64::from(f.rating)))
            .collect();
        if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        }
    }

    pub fn view(&self, now: DateTime<Utc>, viewer: Option<&str>) -> EventView {
        EventView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            event_type: self.event_type,
            category: self.category,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            registration_required: self.registration_required,
            registration_open_date: self.registration_open_date,
            registration_close_date: self.registration_close_date,
            location: self.location.clone(),
            capacity: self.capacity,
            allow_cancellation: self.allow_cancellation,
            organizers: self.organizers.clone(),
            image_url: self.image_url.clone(),
            registration_count: self.registration_count(),
            available_slots: self.available_slots(),
            registration_status: self.registration_status(now),
            is_registered: viewer.is_some_and(|id| self.is_registered(id)),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public representation of an [`Event`] with derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub category: HealthTopic,
    pub status: EventStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_required: bool,
    pub registration_open_date: DateTime<Utc>,
    pub registration_close_date: DateTime<Utc>,
    pub location: String,
    pub capacity: Option<u32>,
    pub allow_cancellation: bool,
    pub organizers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub registration_count: usize,
    /// `null` when uncapped.
    pub available_slots: Option<u32>,
    pub registration_status: RegistrationStatus,
    /// Whether the requesting principal is registered.
    pub is_registered: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    /// Open for registration now, starting in two hours.
    pub(crate) fn open_event(now: DateTime<Utc>, capacity: Option<u32>) -> Event {
        Event {
            id: super::super::new_id(),
            title: "Stress Management Workshop".into(),
            description: "Practical techniques for exam season".into(),
            event_type: EventType::Workshop,
            category: HealthTopic::MentalHealth,
            status: EventStatus::Published,
            start_date: now + Duration::hours(2),
            end_date: now + Duration::hours(3),
            registration_required: true,
            registration_open_date: now - Duration::hours(1),
            registration_close_date: now + Duration::hours(1),
            location: "Student Center 101".into(),
            capacity,
            allow_cancellation: true,
            organizers: vec![],
            registrations: vec![],
            image_url: None,
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn message(err: ServiceError) -> String {
        match err {
            ServiceError::InvalidOperation(m) => m,
            other => panic!("expected InvalidOperation, got {other:?}"),
        }
    }

    #[test]
    fn capacity_one_scenario() {
        let now = Utc::now();
        let mut event = open_event(now, Some(1));

        event.register("user_a", now).unwrap();
        assert_eq!(event.registrations.len(), 1);

        let err = event.register("user_b", now).unwrap_err();
        assert_eq!(message(err), "Event is full");
        assert_eq!(event.registrations.len(), 1);
        assert_eq!(event.registration_status(now), RegistrationStatus::Full);
    }

    #[test]
    fn registrations_never_exceed_capacity() {
        let now = Utc::now();
        let mut event = open_event(now, Some(3));
        for i in 0..10 {
            let _ = event.register(&format!("user_{i}"), now);
            assert!(event.registrations.len() <= 3);
        }
        assert_eq!(event.available_slots(), Some(0));
    }

    #[test]
    fn uncapped_event_has_no_slot_count() {
        let now = Utc::now();
        let event = open_event(now, None);
        assert_eq!(event.available_slots(), None);
        assert_eq!(event.registration_status(now), RegistrationStatus::Open);
    }

    #[test]
    fn register_then_unregister_restores_list() {
        let now = Utc::now();
        let mut event = open_event(now, Some(5));
        event.register("existing", now).unwrap();
        let before = event.registrations.clone();

        event.register("user_a", now).unwrap();
        event.unregister("user_a", now).unwrap();
        assert_eq!(event.registrations, before);
    }

    #[test]
    fn guards_report_specific_reasons() {
        let now = Utc::now();

        let mut event = open_event(now, None);
        event.registration_required = false;
        assert_eq!(
            message(event.register("u", now).unwrap_err()),
            "Registration is not required for this event"
        );

        let event = open_event(now, None);
        let mut early = event.clone();
        assert_eq!(
            message(early.register("u", now - Duration::hours(2)).unwrap_err()),
            "Registration has not opened yet"
        );
        let mut late = event.clone();
        assert_eq!(
            message(late.register("u", now + Duration::minutes(90)).unwrap_err()),
            "Registration is closed"
        );

        let mut twice = event.clone();
        twice.register("u", now).unwrap();
        assert_eq!(
            message(twice.register("u", now).unwrap_err()),
            "You are already registered for this event"
        );

        let mut started = event.clone();
        started.start_date = now - Duration::minutes(1);
        started.registration_close_date = now + Duration::minutes(5);
        assert_eq!(
            message(started.register("u", now).unwrap_err()),
            "Event has already started"
        );

        let mut cancelled = event;
        cancelled.status = EventStatus::Cancelled;
        assert_eq!(
            message(cancelled.register("u", now).unwrap_err()),
            "Event has been cancelled"
        );
    }

    #[test]
    fn unregister_guards() {
        let now = Utc::now();
        let mut event = open_event(now, None);
        assert_eq!(
            message(event.unregister("u", now).unwrap_err()),
            "You are not registered for this event"
        );

        event.register("u", now).unwrap();
        event.allow_cancellation = false;
        assert_eq!(
            message(event.unregister("u", now).unwrap_err()),
            "Cancellation is not allowed for this event"
        );

        event.allow_cancellation = true;
        assert!(event
            .unregister("u", now + Duration::minutes(61))
            .is_err());
        assert!(event.is_registered("u"));
    }

    #[test]
    fn attendance_ignores_window_and_gates_feedback() {
        let now = Utc::now();
        let mut event = open_event(now, None);
        event.register("u", now).unwrap();

        assert_eq!(
            message(event.submit_feedback("u", 5, None, now).unwrap_err()),
            "Only attendees can leave feedback"
        );

        let later = now + Duration::days(3);
        event.mark_attendance("u", true, later).unwrap();
        event.submit_feedback("u", 4, Some("Great".into()), later).unwrap();
        event.submit_feedback("u", 5, None, later).unwrap();
        assert_eq!(event.average_rating(), Some(5.0));

        assert!(matches!(
            event.mark_attendance("ghost", true, later),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn schedule_invariants() {
        let now = Utc::now();
        let mut event = open_event(now, None);
        assert!(event.check_schedule().is_ok());

        event.registration_close_date = event.start_date + Duration::minutes(1);
        event.end_date = event.start_date - Duration::minutes(1);
        match event.check_schedule().unwrap_err() {
            ServiceError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "end_date");
                assert_eq!(errors[1].field, "registration_close_date");
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut reversed = open_event(now, None);
        reversed.registration_close_date = reversed.registration_open_date - Duration::minutes(1);
        assert!(reversed.check_schedule().is_err());
    }

    #[test]
    fn capacity_cannot_drop_below_registrations() {
        let now = Utc::now();
        let mut event = open_event(now, Some(5));
        event.register("a", now).unwrap();
        event.register("b", now).unwrap();
        event.capacity = Some(1);
        assert!(event.check_schedule().is_err());
    }

    #[test]
    fn view_derives_status_for_viewer() {
        let now = Utc::now();
        let mut event = open_event(now, Some(2));
        event.register("me", now).unwrap();

        let view = event.view(now, Some("me"));
        assert!(view.is_registered);
        assert_eq!(view.available_slots, Some(1));
        assert_eq!(view.registration_status, RegistrationStatus::Open);
        assert!(!event.view(now, None).is_registered);
        assert_eq!(
            event.view(now + Duration::hours(5), None).registration_status,
            RegistrationStatus::Closed
        );
    }
}
