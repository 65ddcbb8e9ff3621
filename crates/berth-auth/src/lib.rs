//! # berth-auth
//!
//! The authenticated-session core of the Berth SDK.
//!
//! - **Session record**: [`AuthInfo`] with its merge and logout
//!   transitions, persisted as JSON under a single storage key
//! - **Credentials**: [`Credential`], a tagged union over the login
//!   providers the backend understands
//! - **Users**: [`UserFactory`] seam plus the default [`CoreUser`]
//! - **Auth client**: [`AuthClient`] — login, link, logout, token
//!   refresh, and the transparent refresh-and-retry request pipeline
//! - **Refresh loop**: a background task that renews the access token
//!   shortly before it expires
//! - **Events**: [`AuthEvent`] broadcast on every login and logout

#![deny(unsafe_code)]

pub mod auth_info;
pub mod client;
pub mod credential;
pub mod events;
pub mod metadata;
pub mod refresh;
pub mod routes;
pub mod user;

pub use auth_info::AuthInfo;
pub use client::{AUTH_INFO_STORAGE_KEY, AuthClient};
pub use credential::{Credential, ProviderType};
pub use events::AuthEvent;
pub use metadata::ClientAppMetadata;
pub use refresh::{DEFAULT_EXPIRY_WINDOW_SECS, DEFAULT_REFRESH_INTERVAL_SECS, RefreshConfig};
pub use routes::{AppAuthRoutes, AuthRoutes};
pub use user::{AuthUser, CoreUser, CoreUserFactory, Identity, UserFactory, UserProfile};
