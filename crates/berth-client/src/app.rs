//! App-client wiring.
//!
//! [`AppClient`] assembles storage, transport, routes, and a user
//! factory into a ready [`AuthClient`] and fronts its session surface.
//! Resource clients (functions, services, and so on) are expected to
//! hold the [`auth`](AppClient::auth) handle and send every backend
//! call through its authenticated-request pipeline.

use std::sync::Arc;

use tokio::sync::broadcast;

use berth_auth::{
    AppAuthRoutes, AuthClient, AuthEvent, AuthRoutes, ClientAppMetadata, CoreUserFactory,
    Credential, RefreshConfig, UserFactory,
};
use berth_core::{BerthError, MemoryStorage, Request, Response, Result, Storage, Transport};

use crate::transport::ReqwestTransport;

/// A configured client for one backend app.
///
/// Thin facade over the session core; cloning is cheap and clones share
/// one session.
pub struct AppClient<F: UserFactory = CoreUserFactory> {
    auth: AuthClient<F>,
}

impl<F: UserFactory> Clone for AppClient<F> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl AppClient<CoreUserFactory> {
    /// Start building a client for `app_id` against `base_url`.
    #[must_use]
    pub fn builder(app_id: impl Into<String>, base_url: impl Into<String>) -> AppClientBuilder {
        AppClientBuilder {
            app_id: app_id.into(),
            base_url: base_url.into(),
            app_version: None,
            storage: None,
            transport: None,
            routes: None,
            refresh: RefreshConfig::default(),
        }
    }
}

impl<F: UserFactory> AppClient<F> {
    /// The session core.
    #[must_use]
    pub fn auth(&self) -> &AuthClient<F> {
        &self.auth
    }

    /// Log a user in with `credential`.
    pub async fn login_with_credential(&self, credential: &Credential) -> Result<F::User> {
        self.auth.login_with_credential(credential).await
    }

    /// Attach `credential` as an additional login identity on `user`.
    pub async fn link_user_with_credential(
        &self,
        user: &F::User,
        credential: &Credential,
    ) -> Result<F::User> {
        self.auth.link_user_with_credential(user, credential).await
    }

    /// End the active session.
    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await
    }

    /// Whether a complete logged-in session is active.
    pub async fn is_logged_in(&self) -> bool {
        self.auth.is_logged_in().await
    }

    /// The active user, when logged in.
    pub async fn current_user(&self) -> Option<F::User> {
        self.auth.current_user().await
    }

    /// Perform `request` through the authenticated pipeline.
    pub async fn authenticated_request(&self, request: &Request) -> Result<Response> {
        self.auth.authenticated_request(request).await
    }

    /// Subscribe to login/logout notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    /// Stop the background refresh loop.
    pub fn close(&self) {
        self.auth.close();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`AppClient`].
///
/// Storage defaults to [`MemoryStorage`]; hosts that want sessions to
/// survive a restart pass a [`FileStorage`](berth_core::FileStorage) or
/// their own backend. The transport defaults to [`ReqwestTransport`]
/// against `base_url`.
pub struct AppClientBuilder {
    app_id: String,
    base_url: String,
    app_version: Option<String>,
    storage: Option<Arc<dyn Storage>>,
    transport: Option<Arc<dyn Transport>>,
    routes: Option<Arc<dyn AuthRoutes>>,
    refresh: RefreshConfig,
}

impl AppClientBuilder {
    /// Use `storage` for session persistence.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use `transport` instead of the default reqwest one.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom auth route layout.
    #[must_use]
    pub fn routes(mut self, routes: Arc<dyn AuthRoutes>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Report `version` as the calling application's version.
    #[must_use]
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Override the background refresh cadence.
    #[must_use]
    pub fn refresh_config(mut self, config: RefreshConfig) -> Self {
        self.refresh = config;
        self
    }

    /// Build with the default [`CoreUserFactory`].
    pub async fn build(self) -> Result<AppClient<CoreUserFactory>> {
        self.build_with_factory(CoreUserFactory).await
    }

    /// Build with a custom user factory.
    pub async fn build_with_factory<F: UserFactory>(self, factory: F) -> Result<AppClient<F>> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.base_url).map_err(BerthError::Network)?),
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let routes = self
            .routes
            .unwrap_or_else(|| Arc::new(AppAuthRoutes::new(&self.app_id)));

        let mut metadata = ClientAppMetadata::new(self.app_id);
        if let Some(version) = self.app_version {
            metadata = metadata.with_app_version(version);
        }

        let auth =
            AuthClient::new(transport, storage, routes, factory, metadata, self.refresh).await?;
        Ok(AppClient { auth })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use berth_auth::AUTH_INFO_STORAGE_KEY;

    use super::*;

    #[tokio::test]
    async fn build_restores_a_session_from_injected_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let record = json!({
            "user_id": "user-1",
            "device_id": "device-1",
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "logged_in_provider_type": "anon-user",
            "logged_in_provider_name": "anon-user",
        });
        storage
            .set(AUTH_INFO_STORAGE_KEY, &record.to_string())
            .await
            .unwrap();

        let client = AppClient::builder("my-app", "http://localhost:9")
            .storage(storage)
            .build()
            .await
            .unwrap();

        assert!(client.is_logged_in().await);
        assert_eq!(client.current_user().await.unwrap().id, "user-1");
    }

    #[tokio::test]
    async fn build_starts_logged_out_with_default_storage() {
        let client = AppClient::builder("my-app", "http://localhost:9")
            .app_version("3.2.1")
            .build()
            .await
            .unwrap();

        assert!(!client.is_logged_in().await);
        assert!(client.current_user().await.is_none());
    }
}
