//! The session record.
//!
//! [`AuthInfo`] is the single value-type snapshot of "who is logged in
//! and with what tokens". It moves between states through two total
//! transitions: [`merge`](AuthInfo::merge) overlays fresh fields from a
//! login or token refresh, [`logged_out`](AuthInfo::logged_out) clears
//! everything except the device id. The record serializes to the JSON
//! document persisted under the auth storage key.

use serde::{Deserialize, Serialize};

use crate::credential::ProviderType;
use crate::user::UserProfile;

/// The durable session record: identity plus token material.
///
/// All fields are optional; a freshly installed client starts with
/// every field unset. The persisted JSON uses these exact field names,
/// so renames here are wire-format changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Backend id of the authenticated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Backend-assigned device id, kept across logouts so the backend
    /// can correlate sessions from one installation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Short-lived bearer token for ordinary requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Long-lived token used to mint fresh access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Provider type that performed the login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_provider_type: Option<ProviderType>,
    /// Provider name that performed the login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_provider_name: Option<String>,
    /// Profile document fetched after login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
}

impl AuthInfo {
    /// A record with every field unset.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the record holds a complete logged-in identity: a user
    /// id plus both tokens.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some() && self.access_token.is_some() && self.refresh_token.is_some()
    }

    /// Field-wise overlay: fields set in `update` replace this record's
    /// fields, unset fields carry the existing values forward.
    ///
    /// A token refresh merges in only new tokens; a login merges in a
    /// whole identity. Neither ever clears a field.
    #[must_use]
    pub fn merge(&self, update: &AuthInfo) -> AuthInfo {
        AuthInfo {
            user_id: update.user_id.clone().or_else(|| self.user_id.clone()),
            device_id: update.device_id.clone().or_else(|| self.device_id.clone()),
            access_token: update
                .access_token
                .clone()
                .or_else(|| self.access_token.clone()),
            refresh_token: update
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            logged_in_provider_type: update
                .logged_in_provider_type
                .or(self.logged_in_provider_type),
            logged_in_provider_name: update
                .logged_in_provider_name
                .clone()
                .or_else(|| self.logged_in_provider_name.clone()),
            user_profile: update
                .user_profile
                .clone()
                .or_else(|| self.user_profile.clone()),
        }
    }

    /// The record that survives a logout: only the device id.
    #[must_use]
    pub fn logged_out(&self) -> AuthInfo {
        AuthInfo {
            device_id: self.device_id.clone(),
            ..AuthInfo::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn logged_in_record() -> AuthInfo {
        AuthInfo {
            user_id: Some("user-1".to_string()),
            device_id: Some("device-1".to_string()),
            access_token: Some("access-1".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            logged_in_provider_type: Some(ProviderType::Anonymous),
            logged_in_provider_name: Some("anon-user".to_string()),
            user_profile: Some(UserProfile::default()),
        }
    }

    #[test]
    fn empty_record_is_logged_out() {
        let info = AuthInfo::empty();
        assert!(!info.is_logged_in());
        assert_eq!(info, AuthInfo::default());
    }

    #[test]
    fn logged_in_requires_id_and_both_tokens() {
        assert!(logged_in_record().is_logged_in());

        let mut missing_access = logged_in_record();
        missing_access.access_token = None;
        assert!(!missing_access.is_logged_in());

        let mut missing_refresh = logged_in_record();
        missing_refresh.refresh_token = None;
        assert!(!missing_refresh.is_logged_in());

        let mut missing_id = logged_in_record();
        missing_id.user_id = None;
        assert!(!missing_id.is_logged_in());
    }

    #[test]
    fn merge_prefers_update_fields() {
        let base = logged_in_record();
        let update = AuthInfo {
            access_token: Some("access-2".to_string()),
            refresh_token: Some("refresh-2".to_string()),
            ..AuthInfo::empty()
        };

        let merged = base.merge(&update);
        assert_eq!(merged.access_token.as_deref(), Some("access-2"));
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh-2"));
        // Unset fields carry the existing values forward.
        assert_eq!(merged.user_id, base.user_id);
        assert_eq!(merged.device_id, base.device_id);
        assert_eq!(merged.logged_in_provider_type, Some(ProviderType::Anonymous));
        assert_eq!(merged.user_profile, base.user_profile);
    }

    #[test]
    fn merge_into_empty_takes_update_wholesale() {
        let update = logged_in_record();
        assert_eq!(AuthInfo::empty().merge(&update), update);
    }

    #[test]
    fn merge_with_empty_update_changes_nothing() {
        let base = logged_in_record();
        assert_eq!(base.merge(&AuthInfo::empty()), base);
    }

    #[test]
    fn merge_never_clears_a_field() {
        let base = logged_in_record();
        let update = AuthInfo {
            user_id: Some("user-2".to_string()),
            ..AuthInfo::empty()
        };
        let merged = base.merge(&update);
        assert_eq!(merged.user_id.as_deref(), Some("user-2"));
        assert!(merged.access_token.is_some());
        assert!(merged.user_profile.is_some());
    }

    #[test]
    fn logged_out_keeps_only_device_id() {
        let cleared = logged_in_record().logged_out();
        assert_eq!(cleared.device_id.as_deref(), Some("device-1"));
        assert_eq!(cleared.user_id, None);
        assert_eq!(cleared.access_token, None);
        assert_eq!(cleared.refresh_token, None);
        assert_eq!(cleared.logged_in_provider_type, None);
        assert_eq!(cleared.logged_in_provider_name, None);
        assert_eq!(cleared.user_profile, None);
        assert!(!cleared.is_logged_in());
    }

    #[test]
    fn serializes_with_stable_field_names() {
        let value = serde_json::to_value(logged_in_record()).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "user-1",
                "device_id": "device-1",
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "logged_in_provider_type": "anon-user",
                "logged_in_provider_name": "anon-user",
                "user_profile": {},
            })
        );
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let value = serde_json::to_value(AuthInfo::empty()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn round_trips_through_json() {
        let record = logged_in_record();
        let raw = serde_json::to_string(&record).unwrap();
        let parsed: AuthInfo = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, record);
    }
}
