// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! System settings singleton: admin read/update and the public subset.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::assign;
use crate::{
    audit_log,
    auth::AuthenticatedUser,
    domain::{FeatureToggles, SecuritySettings, SystemSettings},
    error::ServiceResult,
    state::AppState,
    storage::AuditEventType,
    validation::{is_valid_link, Validate, Validator},
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    /// Replaces the whole map.
    pub social_links: Option<BTreeMap<String, String>>,
    pub features: Option<FeatureToggles>,
    pub security: Option<SecuritySettings>,
}

impl Validate for UpdateSettingsRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("site_name", self.site_name.as_deref(), 2, 100);
        v.optional_length("site_description", self.site_description.as_deref(), 1, 500);
        if let Some(email) = &self.contact_email {
            v.email("contact_email", email);
        }
        v.optional_length("contact_phone", self.contact_phone.as_deref(), 5, 30);
        v.optional_length("address", self.address.as_deref(), 1, 300);
        if let Some(links) = &self.social_links {
            for link in links.values() {
                v.check(is_valid_link(link), "social_links", format!("invalid link: {link}"));
            }
        }
        if let Some(security) = &self.security {
            v.range("security.max_login_attempts", security.max_login_attempts, 0, 100);
            v.range("security.lockout_minutes", security.lockout_minutes, 1, 24 * 60);
        }
    }
}

/// What anonymous visitors may see.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub features: FeatureToggles,
}

impl From<SystemSettings> for PublicSettings {
    fn from(s: SystemSettings) -> Self {
        Self {
            site_name: s.site_name,
            site_description: s.site_description,
            contact_email: s.contact_email,
            contact_phone: s.contact_phone,
            address: s.address,
            social_links: s.social_links,
            features: s.features,
        }
    }
}

pub async fn get(state: &AppState) -> SystemSettings {
    state.settings().await
}

pub async fn public(state: &AppState) -> PublicSettings {
    state.settings().await.into()
}

pub async fn update(
    state: &AppState,
    admin: &AuthenticatedUser,
    req: UpdateSettingsRequest,
    now: DateTime<Utc>,
) -> ServiceResult<SystemSettings> {
    let updated = {
        let _gate = state.exclusive().await;
        let mut settings = state.settings().await;
        if let Some(name) = req.site_name {
            settings.site_name = name.trim().to_string();
        }
        assign(&mut settings.site_description, req.site_description);
        if let Some(email) = req.contact_email {
            settings.contact_email = email.trim().to_lowercase();
        }
        if req.contact_phone.is_some() {
            settings.contact_phone = req.contact_phone;
        }
        if req.address.is_some() {
            settings.address = req.address;
        }
        assign(&mut settings.social_links, req.social_links);
        assign(&mut settings.features, req.features);
        assign(&mut settings.security, req.security);
        settings.updated_by = Some(admin.user_id.clone());
        settings.updated_at = Some(now);

        state.replace_settings(settings.clone()).await?;
        settings
    };

    audit_log!(state.storage(), AuditEventType::SettingsUpdated, admin);
    tracing::info!(admin = %admin.user_id, "System settings updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;
    use crate::storage::SettingsRepository;

    #[tokio::test]
    async fn update_persists_and_publishes() {
        let (state, _temp) = test_state();
        let admin = principal(&state, "admin", &[Role::Admin]);
        let now = Utc::now();

        let req = UpdateSettingsRequest {
            site_name: Some("Campus Wellness".into()),
            features: Some(FeatureToggles { gallery_uploads: false, ..Default::default() }),
            ..Default::default()
        };
        let updated = update(&state, &admin, req, now).await.unwrap();
        assert_eq!(updated.updated_by.as_deref(), Some(admin.user_id.as_str()));

        let stored = SettingsRepository::new(state.storage()).load().unwrap();
        assert_eq!(stored.site_name, "Campus Wellness");
        assert!(!stored.features.gallery_uploads);

        let public = public(&state).await;
        assert_eq!(public.site_name, "Campus Wellness");
        assert!(public.features.event_registration);
    }

    #[test]
    fn lockout_window_must_be_positive() {
        let req = UpdateSettingsRequest {
            security: Some(SecuritySettings { max_login_attempts: 3, lockout_minutes: 0 }),
            ..Default::default()
        };
        assert!(req.validated().is_err());
    }
}
