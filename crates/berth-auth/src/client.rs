//! The authenticated-session core.
//!
//! [`AuthClient`] owns the session record and the active user. It
//! performs credential exchange against the backend's provider routes,
//! persists session state through [`Storage`], and runs every
//! authenticated request through a pipeline that transparently refreshes
//! an expired access token and retries once.
//!
//! State changes follow one discipline: merge or clear the record,
//! persist the result, and only then commit it to memory, all under a
//! single write-lock hold. Login, link, and logout additionally
//! serialize behind an operation lock so a login can never begin while
//! a logout is mid-flight.

use std::sync::Arc;

use chrono::Utc;
use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use berth_core::{
    ClientError, Jwt, Request, Response, Result, Storage, TokenPolicy, Transport, TransportError,
};

use crate::auth_info::AuthInfo;
use crate::credential::Credential;
use crate::events::AuthEvent;
use crate::metadata::ClientAppMetadata;
use crate::refresh::{self, RefreshConfig};
use crate::routes::AuthRoutes;
use crate::user::{AuthUser, UserFactory, UserProfile};

/// Storage key the serialized session record lives under.
pub const AUTH_INFO_STORAGE_KEY: &str = "auth_info";

/// Submissions of one request through the authenticated pipeline: the
/// original attempt plus a single recovery retry.
const MAX_REQUEST_ATTEMPTS: u32 = 2;

/// Capacity of the auth-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Client state
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory session state: the record plus the user derived from it.
///
/// The two always change together; a user exists exactly when the
/// record carries a user id.
struct AuthState<U> {
    info: AuthInfo,
    user: Option<U>,
}

pub(crate) struct AuthInner<F: UserFactory> {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    routes: Arc<dyn AuthRoutes>,
    user_factory: F,
    metadata: ClientAppMetadata,
    state: RwLock<AuthState<F::User>>,
    /// Serializes login, link, and logout.
    op_lock: Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
    refresh_task: JoinHandle<()>,
}

impl<F: UserFactory> Drop for AuthInner<F> {
    fn drop(&mut self) {
        self.refresh_task.abort();
    }
}

/// The authenticated-session core.
///
/// Cloning is cheap; clones share one session. Dropping the last clone
/// stops the background refresh loop.
pub struct AuthClient<F: UserFactory> {
    inner: Arc<AuthInner<F>>,
}

impl<F: UserFactory> Clone for AuthClient<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Derive the user a record describes, if any.
///
/// A record with a user id but no provider stamp cannot have been
/// written by this SDK and is rejected as corrupt.
fn build_user<F: UserFactory>(
    factory: &F,
    info: &AuthInfo,
) -> std::result::Result<Option<F::User>, ClientError> {
    let Some(user_id) = &info.user_id else {
        return Ok(None);
    };
    match (&info.logged_in_provider_type, &info.logged_in_provider_name) {
        (Some(provider_type), Some(provider_name)) => Ok(Some(factory.make_user(
            user_id,
            *provider_type,
            provider_name,
            info.user_profile.as_ref(),
        ))),
        _ => Err(ClientError::CorruptSession(
            "record has a user id but no provider".to_string(),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction and accessors
// ─────────────────────────────────────────────────────────────────────────────

impl<F: UserFactory> AuthClient<F> {
    /// Build the session core: load any persisted record, derive the
    /// active user from it, and start the background refresh loop.
    ///
    /// Fails with a [`ClientError`] when storage is unreadable or the
    /// persisted record does not parse.
    pub async fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        routes: Arc<dyn AuthRoutes>,
        user_factory: F,
        metadata: ClientAppMetadata,
        refresh: RefreshConfig,
    ) -> Result<Self> {
        let info = match storage
            .get(AUTH_INFO_STORAGE_KEY)
            .await
            .map_err(ClientError::Storage)?
        {
            Some(raw) => serde_json::from_str::<AuthInfo>(&raw)
                .map_err(|e| ClientError::CorruptSession(e.to_string()))?,
            None => AuthInfo::empty(),
        };
        let user = build_user(&user_factory, &info)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new_cyclic(|weak| AuthInner {
            transport,
            storage,
            routes,
            user_factory,
            metadata,
            state: RwLock::new(AuthState { info, user }),
            op_lock: Mutex::new(()),
            events,
            refresh_task: refresh::spawn_refresh_loop(weak.clone(), refresh),
        });
        Ok(Self { inner })
    }

    pub(crate) fn from_inner(inner: Arc<AuthInner<F>>) -> Self {
        Self { inner }
    }

    /// Whether a complete logged-in session is active.
    pub async fn is_logged_in(&self) -> bool {
        self.inner.state.read().await.info.is_logged_in()
    }

    /// The active user, when logged in.
    pub async fn current_user(&self) -> Option<F::User> {
        self.inner.state.read().await.user.clone()
    }

    /// Backend id of the active user, when logged in.
    pub async fn authed_user_id(&self) -> Option<String> {
        self.inner.state.read().await.info.user_id.clone()
    }

    /// A snapshot of the session record.
    pub async fn auth_info(&self) -> AuthInfo {
        self.inner.state.read().await.info.clone()
    }

    /// Subscribe to login/logout notifications.
    ///
    /// Events fired before the subscription are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// Stop the background refresh loop. Affects every clone of this
    /// client; requests keep working through the per-request retry.
    pub fn close(&self) {
        self.inner.refresh_task.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login, link, logout
// ─────────────────────────────────────────────────────────────────────────────

impl<F: UserFactory> AuthClient<F> {
    /// Log a user in with `credential`.
    ///
    /// An active session from the same provider is reused without a
    /// network call when the credential allows it (anonymous re-login).
    /// Any other active session is logged out first, then the exchange
    /// runs: provider login, profile fetch, persist, commit. If the
    /// profile fetch fails the record is rolled back and nothing is
    /// persisted.
    pub async fn login_with_credential(&self, credential: &Credential) -> Result<F::User> {
        let _op = self.inner.op_lock.lock().await;

        let was_logged_in = {
            let state = self.inner.state.read().await;
            if credential.reuses_existing_session()
                && state.info.logged_in_provider_type == Some(credential.provider_type())
            {
                if let Some(user) = &state.user {
                    debug!(provider = %credential.provider_type(), "reusing active session");
                    return Ok(user.clone());
                }
            }
            state.info.is_logged_in()
        };
        if was_logged_in {
            self.logout_inner().await?;
        }
        self.do_login(credential, false).await
    }

    /// Attach `credential` as an additional login identity on `user`.
    ///
    /// Runs the login exchange authenticated against the link route, so
    /// the backend merges the identity into the existing account rather
    /// than minting a new one. Fails without a network call when `user`
    /// is no longer the active user.
    pub async fn link_user_with_credential(
        &self,
        user: &F::User,
        credential: &Credential,
    ) -> Result<F::User> {
        let _op = self.inner.op_lock.lock().await;

        {
            let state = self.inner.state.read().await;
            if state.info.user_id.as_deref() != Some(user.id()) {
                return Err(ClientError::UserNoLongerValid.into());
            }
        }
        self.do_login(credential, true).await
    }

    /// End the active session.
    ///
    /// Tells the backend to invalidate the session, then clears local
    /// state. The backend call is best-effort: a network failure still
    /// logs out locally. A no-op when already logged out.
    pub async fn logout(&self) -> Result<()> {
        let _op = self.inner.op_lock.lock().await;
        self.logout_inner().await
    }

    /// Logout body, called with the operation lock already held.
    async fn logout_inner(&self) -> Result<()> {
        let logged_in = self.inner.state.read().await.info.is_logged_in();
        if !logged_in {
            return Ok(());
        }

        let request = Request::builder(Method::DELETE, self.inner.routes.session_route())
            .token_policy(TokenPolicy::Refresh)
            .build();
        if let Err(error) = self.authenticated_request(&request).await {
            warn!(%error, "session delete failed during logout; clearing local session");
        }
        self.finalize_logout().await
    }

    /// Clear the session: persist the logged-out record, drop the user,
    /// fire the notification. Persistence failure leaves memory
    /// untouched and propagates. Idempotent.
    async fn finalize_logout(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if state.user.is_none() && !state.info.is_logged_in() {
            return Ok(());
        }
        let previous_user_id = state.info.user_id.clone().unwrap_or_default();
        let cleared = state.info.logged_out();
        let payload = serde_json::to_string(&cleared)?;
        self.inner
            .storage
            .set(AUTH_INFO_STORAGE_KEY, &payload)
            .await
            .map_err(ClientError::Storage)?;
        state.info = cleared;
        state.user = None;
        drop(state);

        let _ = self.inner.events.send(AuthEvent::LoggedOut {
            user_id: previous_user_id.clone(),
        });
        info!(user_id = %previous_user_id, "logged out");
        Ok(())
    }

    /// The login exchange shared by login and link.
    async fn do_login(&self, credential: &Credential, as_link: bool) -> Result<F::User> {
        let body = self.login_body(credential).await;
        let route = if as_link {
            self.inner.routes.link_route(credential.provider_name())
        } else {
            self.inner.routes.login_route(credential.provider_name())
        };
        let request = Request::builder(Method::POST, route).json(&body)?.build();

        let response = if as_link {
            self.authenticated_request(&request).await?
        } else {
            let response = self.inner.transport.round_trip(&request).await?;
            response.check_status()?
        };
        let exchange: ApiLoginResponse = response.json()?;

        // Provisional state: tokens and identity land in memory so the
        // profile fetch can authenticate, but nothing persists until
        // the profile arrives.
        let (previous_info, previous_user) = {
            let mut state = self.inner.state.write().await;
            let previous_info = state.info.clone();
            let previous_user = state.user.take();
            let update = AuthInfo {
                user_id: Some(exchange.user_id),
                device_id: exchange.device_id,
                access_token: Some(exchange.access_token),
                refresh_token: Some(exchange.refresh_token),
                logged_in_provider_type: Some(credential.provider_type()),
                logged_in_provider_name: Some(credential.provider_name().to_string()),
                user_profile: None,
            };
            let merged = state.info.merge(&update);
            let user = build_user(&self.inner.user_factory, &merged)?.ok_or_else(|| {
                ClientError::CorruptSession("login response lacked a user id".to_string())
            })?;
            state.info = merged;
            state.user = Some(user);
            (previous_info, previous_user)
        };

        match self.fetch_profile_and_commit().await {
            Ok(user) => Ok(user),
            Err(error) => {
                // A login must never leave tokens behind without a
                // committed profile.
                let mut state = self.inner.state.write().await;
                state.info = previous_info;
                state.user = previous_user;
                drop(state);
                warn!(%error, "profile fetch failed; login rolled back");
                Err(error)
            }
        }
    }

    /// Fetch the profile for the provisional session, then persist and
    /// commit the full record.
    async fn fetch_profile_and_commit(&self) -> Result<F::User> {
        let request = Request::builder(Method::GET, self.inner.routes.profile_route()).build();
        let response = self.authenticated_request(&request).await?;
        let profile: UserProfile = response.json()?;

        let mut state = self.inner.state.write().await;
        let update = AuthInfo {
            user_profile: Some(profile),
            ..AuthInfo::empty()
        };
        let merged = state.info.merge(&update);
        // A forced logout can land while the profile is in flight;
        // derive the user first so a userless record never reaches
        // storage.
        let user = build_user(&self.inner.user_factory, &merged)?.ok_or_else(|| {
            ClientError::CorruptSession("session record lost its user id".to_string())
        })?;
        let payload = serde_json::to_string(&merged)?;
        self.inner
            .storage
            .set(AUTH_INFO_STORAGE_KEY, &payload)
            .await
            .map_err(ClientError::Storage)?;
        state.info = merged;
        state.user = Some(user.clone());
        let user_id = state.info.user_id.clone().unwrap_or_default();
        drop(state);

        let _ = self.inner.events.send(AuthEvent::LoggedIn {
            user_id: user_id.clone(),
        });
        info!(user_id = %user_id, "login committed");
        Ok(user)
    }

    /// Credential material plus the device sub-object.
    async fn login_body(&self, credential: &Credential) -> Map<String, Value> {
        let mut body = credential.material();
        let device_id = self.inner.state.read().await.info.device_id.clone();

        let mut device = Map::new();
        if let Some(id) = device_id {
            let _ = device.insert("deviceId".to_string(), json!(id));
        }
        let _ = device.insert("appId".to_string(), json!(self.inner.metadata.app_id));
        if let Some(version) = &self.inner.metadata.app_version {
            let _ = device.insert("appVersion".to_string(), json!(version));
        }
        let _ = device.insert("platform".to_string(), json!(self.inner.metadata.platform));
        let _ = device.insert(
            "sdkVersion".to_string(),
            json!(self.inner.metadata.sdk_version),
        );

        let _ = body.insert("options".to_string(), json!({ "device": device }));
        body
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token refresh and the authenticated pipeline
// ─────────────────────────────────────────────────────────────────────────────

impl<F: UserFactory> AuthClient<F> {
    /// Exchange the refresh token for a fresh access token and commit
    /// the result.
    ///
    /// If the backend rejects the refresh token as an invalid session,
    /// the session is unrecoverable: local state is cleared and the
    /// rejection propagates.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let request = Request::builder(Method::POST, self.inner.routes.session_route())
            .token_policy(TokenPolicy::Refresh)
            .build();
        let response = self.authenticated_request(&request).await?;
        let refreshed: ApiSessionRefresh = response.json()?;

        let update = AuthInfo {
            access_token: Some(refreshed.access_token),
            refresh_token: refreshed.refresh_token,
            ..AuthInfo::empty()
        };
        self.merge_and_persist(update).await?;
        debug!("access token refreshed");
        Ok(())
    }

    /// Refresh the access token when it expires within `window_secs`.
    ///
    /// A missing or undecodable token is left alone; the per-request
    /// retry handles those. The background loop calls this on every
    /// tick.
    pub async fn refresh_if_expiring(&self, window_secs: i64) -> Result<()> {
        let access_token = {
            let state = self.inner.state.read().await;
            if !state.info.is_logged_in() {
                return Ok(());
            }
            state.info.access_token.clone()
        };
        let Some(token) = access_token else {
            return Ok(());
        };
        let Ok(jwt) = Jwt::decode(&token) else {
            return Ok(());
        };
        if !jwt.expires_within(Utc::now().timestamp(), window_secs) {
            return Ok(());
        }
        debug!(expires_at = jwt.expires_at, "access token expiring soon; refreshing");
        self.refresh_access_token().await
    }

    /// Perform `request` with session authorization, transparently
    /// recovering once from an expired access token.
    ///
    /// On a backend `InvalidSession` rejection the pipeline refreshes
    /// the access token and resubmits the request, at most once. A
    /// rejection of the refresh token itself clears the session and
    /// propagates. Every other error propagates untouched.
    pub async fn authenticated_request(&self, request: &Request) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.submit_authenticated(request).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if !error.is_invalid_session() {
                        return Err(error);
                    }
                    if request.token_policy == TokenPolicy::Refresh {
                        // The refresh token was rejected; nothing is
                        // left to renew the session with.
                        warn!("refresh token rejected by the backend; forcing logout");
                        self.finalize_logout().await?;
                        return Err(error);
                    }
                    if attempt >= MAX_REQUEST_ATTEMPTS {
                        return Err(error);
                    }
                    self.recover_session(request.started_at).await?;
                }
            }
        }
    }

    /// Perform `request` and deserialize the JSON response body.
    pub async fn authenticated_json_request<T>(&self, request: &Request) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.authenticated_request(request).await?;
        Ok(response.json()?)
    }

    /// One pipeline pass: precondition, bearer header, round trip,
    /// status check.
    async fn submit_authenticated(&self, request: &Request) -> Result<Response> {
        let token = {
            let state = self.inner.state.read().await;
            if !state.info.is_logged_in() {
                return Err(ClientError::MustAuthenticateFirst.into());
            }
            match request.token_policy {
                TokenPolicy::Access => state.info.access_token.clone(),
                TokenPolicy::Refresh => state.info.refresh_token.clone(),
            }
        };
        let Some(token) = token else {
            return Err(ClientError::MustAuthenticateFirst.into());
        };
        let authed = request
            .with_bearer(&token)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let response = self.inner.transport.round_trip(&authed).await?;
        Ok(response.check_status()?)
    }

    /// One recovery step between pipeline attempts.
    ///
    /// When the access token was already replaced after the failing
    /// request was built (another task refreshed first), the retry can
    /// go out as-is; otherwise refresh now. A failed refresh wraps as a
    /// [`ClientError`] and stops the pipeline.
    async fn recover_session(&self, started_at: i64) -> Result<()> {
        let access_token = self.inner.state.read().await.info.access_token.clone();
        if let Some(token) = access_token {
            if let Ok(jwt) = Jwt::decode(&token) {
                if jwt.issued_at >= started_at {
                    debug!("access token already newer than the failed request; retrying as-is");
                    return Ok(());
                }
            }
        }
        // The refresh re-enters the request pipeline; box this leg so
        // the future type stays finite.
        Box::pin(self.refresh_access_token())
            .await
            .map_err(|error| ClientError::RefreshFailed(Box::new(error)))?;
        Ok(())
    }

    /// Merge `update` into the record, persist, and commit, atomically
    /// with respect to other state changes.
    async fn merge_and_persist(&self, update: AuthInfo) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if !state.info.is_logged_in() {
            // The session ended while this update was in flight; the
            // logged-out record stands.
            return Ok(());
        }
        let merged = state.info.merge(&update);
        let payload = serde_json::to_string(&merged)?;
        self.inner
            .storage
            .set(AUTH_INFO_STORAGE_KEY, &payload)
            .await
            .map_err(ClientError::Storage)?;
        state.info = merged;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

/// Body of a successful login or link response.
#[derive(Debug, Deserialize)]
struct ApiLoginResponse {
    user_id: String,
    #[serde(default)]
    device_id: Option<String>,
    access_token: String,
    refresh_token: String,
}

/// Body of a successful session-refresh response.
#[derive(Debug, Deserialize)]
struct ApiSessionRefresh {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
