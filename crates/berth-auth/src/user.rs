//! User profiles and the user-construction seam.
//!
//! The session core stays generic over the concrete user type an SDK
//! variant hands to callers: it derives identity from the session
//! record and asks a [`UserFactory`] to build the rest. [`CoreUser`] is
//! the stock implementation most clients use.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credential::ProviderType;

/// A single login identity attached to a user profile.
///
/// Users accumulate one identity per provider they have logged in or
/// linked through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity id as issued by the provider.
    #[serde(default)]
    pub id: String,
    /// Provider type string, e.g. `anon-user`.
    #[serde(default)]
    pub provider_type: String,
}

/// Profile document fetched from the profile route after login.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Profile type reported by the backend, e.g. `normal`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Free-form profile attributes: name, email, picture URL, and so
    /// on, as the providers reported them.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    /// Login identities attached to the user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
}

impl UserProfile {
    /// A string attribute from the profile data, when present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Minimal view the session core needs of any user type.
pub trait AuthUser {
    /// Backend id of the user.
    fn id(&self) -> &str;
}

/// Builds the SDK-variant-specific user type from session identity.
///
/// Keeps the session core generic: an app client and an admin client
/// can expose different user surfaces over the same auth machinery.
pub trait UserFactory: Send + Sync + 'static {
    /// The user type this factory produces.
    type User: AuthUser + Clone + Send + Sync + 'static;

    /// Assemble a user from the active session's identity fields.
    fn make_user(
        &self,
        id: &str,
        provider_type: ProviderType,
        provider_name: &str,
        profile: Option<&UserProfile>,
    ) -> Self::User;
}

/// Default user type produced by [`CoreUserFactory`].
#[derive(Clone, Debug, PartialEq)]
pub struct CoreUser {
    /// Backend id of the user.
    pub id: String,
    /// Provider type that performed the login.
    pub logged_in_provider_type: ProviderType,
    /// Provider name that performed the login.
    pub logged_in_provider_name: String,
    /// Profile document, once the post-login fetch has completed.
    pub profile: Option<UserProfile>,
}

impl AuthUser for CoreUser {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Factory producing [`CoreUser`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoreUserFactory;

impl UserFactory for CoreUserFactory {
    type User = CoreUser;

    fn make_user(
        &self,
        id: &str,
        provider_type: ProviderType,
        provider_name: &str,
        profile: Option<&UserProfile>,
    ) -> CoreUser {
        CoreUser {
            id: id.to_string(),
            logged_in_provider_type: provider_type,
            logged_in_provider_name: provider_name.to_string(),
            profile: profile.cloned(),
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

    #[test]
    fn profile_deserializes_backend_shape() {
        let profile: UserProfile = serde_json::from_value(json!({
            "type": "normal",
            "data": {"email": "ada@example.com", "name": "Ada"},
            "identities": [
                {"id": "ident-1", "provider_type": "local-userpass"},
                {"id": "ident-2", "provider_type": "oauth2-google"},
            ],
        }))
        .unwrap();

        assert_eq!(profile.user_type.as_deref(), Some("normal"));
        assert_eq!(profile.attribute("email"), Some("ada@example.com"));
        assert_eq!(profile.identities.len(), 2);
        assert_eq!(profile.identities[1].provider_type, "oauth2-google");
    }

    #[test]
    fn profile_tolerates_missing_fields() {
        let profile: UserProfile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(profile.user_type, None);
        assert!(profile.data.is_empty());
        assert!(profile.identities.is_empty());
        assert_eq!(profile.attribute("email"), None);
    }

    #[test]
    fn core_factory_builds_users_from_session_identity() {
        let profile = UserProfile {
            user_type: Some("normal".to_string()),
            ..UserProfile::default()
        };
        let user = CoreUserFactory.make_user(
            "user-1",
            ProviderType::Anonymous,
            "anon-user",
            Some(&profile),
        );

        assert_eq!(user.id(), "user-1");
        assert_eq!(user.logged_in_provider_type, ProviderType::Anonymous);
        assert_eq!(user.logged_in_provider_name, "anon-user");
        assert_eq!(user.profile, Some(profile));
    }

    #[test]
    fn core_factory_allows_absent_profile() {
        let user = CoreUserFactory.make_user("user-2", ProviderType::ApiKey, "api-key", None);
        assert_eq!(user.profile, None);
    }
}
