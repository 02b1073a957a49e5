// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The system settings singleton.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};

/// Member-facing features an admin can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    MemberRegistration,
    EventRegistration,
    StorySubmissions,
    GalleryUploads,
    AnonymousQuestions,
}

impl Feature {
    fn label(&self) -> &'static str {
        match self {
            Feature::MemberRegistration => "Member registration",
            Feature::EventRegistration => "Event registration",
            Feature::StorySubmissions => "Story submissions",
            Feature::GalleryUploads => "Gallery uploads",
            Feature::AnonymousQuestions => "Anonymous questions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FeatureToggles {
    pub member_registration: bool,
    pub event_registration: bool,
    pub story_submissions: bool,
    pub gallery_uploads: bool,
    pub anonymous_questions: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            member_registration: true,
            event_registration: true,
            story_submissions: true,
            gallery_uploads: true,
            anonymous_questions: true,
        }
    }
}

impl FeatureToggles {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::MemberRegistration => self.member_registration,
            Feature::EventRegistration => self.event_registration,
            Feature::StorySubmissions => self.story_submissions,
            Feature::GalleryUploads => self.gallery_uploads,
            Feature::AnonymousQuestions => self.anonymous_questions,
        }
    }
}

/// Login lockout thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SecuritySettings {
    /// Consecutive failures before lockout; 0 disables lockout.
    pub max_login_attempts: u32,
    pub lockout_minutes: i64,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_minutes: 15,
        }
    }
}

/// Site-wide configuration. At most one instance is stored; defaults are
/// synthesized when none exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SystemSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub features: FeatureToggles,
    pub security: SecuritySettings,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_name: "Health Advocacy Club".to_string(),
            site_description: "Student-led health education and advocacy".to_string(),
            contact_email: "healthclub@university.edu".to_string(),
            contact_phone: None,
            address: None,
            social_links: BTreeMap::new(),
            features: FeatureToggles::default(),
            security: SecuritySettings::default(),
            updated_by: None,
            updated_at: None,
        }
    }
}

impl SystemSettings {
    pub fn ensure_enabled(&self, feature: Feature) -> ServiceResult<()> {
        if self.features.is_enabled(feature) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "{} is currently disabled",
                feature.label()
            )))
        }
    }
}
