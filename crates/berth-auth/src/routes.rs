//! Route strings for the auth surface.
//!
//! Pure string computation, injected behind a trait so SDK variants can
//! relocate the auth surface without touching the session core.

/// Supplies the auth-surface routes the session core calls.
pub trait AuthRoutes: Send + Sync {
    /// Route of the session resource: `POST` refreshes the access
    /// token, `DELETE` invalidates the session.
    fn session_route(&self) -> String;

    /// Route of the authenticated user's profile.
    fn profile_route(&self) -> String;

    /// Login route for the provider named `provider_name`.
    fn login_route(&self, provider_name: &str) -> String;

    /// Link route for the provider named `provider_name`: the login
    /// route flagged to attach an identity to the active user.
    fn link_route(&self, provider_name: &str) -> String {
        format!("{}?link=true", self.login_route(provider_name))
    }
}

/// Standard app-client route layout rooted at an app id.
#[derive(Clone, Debug)]
pub struct AppAuthRoutes {
    base: String,
}

impl AppAuthRoutes {
    /// Routes for the app identified by `app_id`.
    #[must_use]
    pub fn new(app_id: &str) -> Self {
        Self {
            base: format!("/api/client/v2.0/app/{app_id}"),
        }
    }
}

impl AuthRoutes for AppAuthRoutes {
    fn session_route(&self) -> String {
        format!("{}/auth/session", self.base)
    }

    fn profile_route(&self) -> String {
        format!("{}/auth/profile", self.base)
    }

    fn login_route(&self, provider_name: &str) -> String {
        format!("{}/auth/providers/{provider_name}/login", self.base)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
