//! Client application metadata.
//!
//! Every login and link request carries a device description so the
//! backend can hand back (or recognize) a device id and attribute
//! sessions to an app build.

/// Identifies the calling application and platform to the backend.
#[derive(Clone, Debug)]
pub struct ClientAppMetadata {
    /// Backend app id. A routing identifier, not a secret.
    pub app_id: String,
    /// Version of the calling application, when the host supplies one.
    pub app_version: Option<String>,
    /// Platform string submitted with login requests.
    pub platform: String,
    /// Version of this SDK.
    pub sdk_version: String,
}

impl ClientAppMetadata {
    /// Metadata for `app_id`, with the platform and SDK version filled
    /// in from the build environment.
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_version: None,
            platform: std::env::consts::OS.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the calling application's version.
    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
