//! Login credentials.
//!
//! A [`Credential`] pairs a provider with the material that provider
//! needs for one login attempt. Credentials are built fresh per attempt
//! and never persisted; only the provider identity survives into the
//! session record.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Identifies a login provider on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    /// Anonymous sessions, no material.
    #[serde(rename = "anon-user")]
    Anonymous,
    /// Username (usually email) and password.
    #[serde(rename = "local-userpass")]
    UserPassword,
    /// A JWT minted by the application's own auth system.
    #[serde(rename = "custom-token")]
    Custom,
    /// Server or user API keys.
    #[serde(rename = "api-key")]
    ApiKey,
    /// Google OAuth2.
    #[serde(rename = "oauth2-google")]
    Google,
    /// Facebook OAuth2.
    #[serde(rename = "oauth2-facebook")]
    Facebook,
}

impl ProviderType {
    /// The wire string for this provider type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anon-user",
            Self::UserPassword => "local-userpass",
            Self::Custom => "custom-token",
            Self::ApiKey => "api-key",
            Self::Google => "oauth2-google",
            Self::Facebook => "oauth2-facebook",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A login mechanism and the material it submits to the backend.
#[derive(Clone, Debug)]
pub enum Credential {
    /// Anonymous login. Reuses an active anonymous session instead of
    /// minting a new identity.
    Anonymous,
    /// Username/password login.
    UserPassword {
        /// Account name, usually an email address.
        username: String,
        /// Account password.
        password: String,
    },
    /// Login with a JWT issued by the application's own auth system.
    Custom {
        /// The externally issued JWT.
        token: String,
    },
    /// Login with a server API key.
    ServerApiKey {
        /// The server API key.
        key: String,
    },
    /// Login with a user API key.
    UserApiKey {
        /// The user API key.
        key: String,
    },
    /// Login with a Google OAuth2 server auth code.
    Google {
        /// The server auth code from Google's OAuth flow.
        auth_code: String,
    },
    /// Login with a Facebook OAuth2 access token.
    Facebook {
        /// The access token from Facebook's OAuth flow.
        access_token: String,
    },
}

impl Credential {
    /// The provider type this credential logs in through.
    #[must_use]
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Anonymous => ProviderType::Anonymous,
            Self::UserPassword { .. } => ProviderType::UserPassword,
            Self::Custom { .. } => ProviderType::Custom,
            Self::ServerApiKey { .. } | Self::UserApiKey { .. } => ProviderType::ApiKey,
            Self::Google { .. } => ProviderType::Google,
            Self::Facebook { .. } => ProviderType::Facebook,
        }
    }

    /// The provider name used to build the login route.
    ///
    /// Providers are named after their type by default.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider_type().as_str()
    }

    /// The JSON material submitted in the login request body.
    #[must_use]
    pub fn material(&self) -> Map<String, Value> {
        let mut material = Map::new();
        match self {
            Self::Anonymous => {}
            Self::UserPassword { username, password } => {
                let _ = material.insert("username".to_string(), json!(username));
                let _ = material.insert("password".to_string(), json!(password));
            }
            Self::Custom { token } => {
                let _ = material.insert("token".to_string(), json!(token));
            }
            Self::ServerApiKey { key } | Self::UserApiKey { key } => {
                let _ = material.insert("key".to_string(), json!(key));
            }
            Self::Google { auth_code } => {
                let _ = material.insert("authCode".to_string(), json!(auth_code));
            }
            Self::Facebook { access_token } => {
                let _ = material.insert("accessToken".to_string(), json!(access_token));
            }
        }
        material
    }

    /// Whether a login with this credential may reuse an already-active
    /// session from the same provider instead of starting a fresh one.
    #[must_use]
    pub fn reuses_existing_session(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
