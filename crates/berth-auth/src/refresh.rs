//! Proactive access-token refresh.
//!
//! A single background task wakes on a fixed interval, inspects the
//! access token's expiry claim, and refreshes shortly before it lapses
//! so callers rarely pay the refresh-and-retry cost inside a request.
//! The task holds only a weak reference to the client and exits when
//! the client is dropped; the per-request retry remains a correctness
//! backstop if the loop is closed or falls behind.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::{AuthClient, AuthInner};
use crate::user::UserFactory;

/// Default seconds between refresh-loop ticks.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Default seconds-to-expiry below which a tick refreshes the token.
pub const DEFAULT_EXPIRY_WINDOW_SECS: i64 = 300;

/// Timing configuration for the background refresh loop.
#[derive(Clone, Copy, Debug)]
pub struct RefreshConfig {
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// Refresh when the token expires within this many seconds.
    pub expiry_window_secs: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
        }
    }
}

/// Spawn the refresh loop for a client under construction.
///
/// Sleep first, then tick: a fresh client has a fresh token, and the
/// weak handle must not keep the client alive between ticks. Tick
/// failures are logged and swallowed; the next tick tries again.
pub(crate) fn spawn_refresh_loop<F: UserFactory>(
    inner: Weak<AuthInner<F>>,
    config: RefreshConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(config.interval_secs)).await;
            let Some(strong) = inner.upgrade() else {
                break;
            };
            let client = AuthClient::from_inner(strong);
            if let Err(error) = client.refresh_if_expiring(config.expiry_window_secs).await {
                warn!(%error, "background token refresh failed");
            }
        }
        debug!("refresh loop stopped");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
