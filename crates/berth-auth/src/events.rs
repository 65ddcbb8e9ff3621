//! Auth change notifications.

/// Emitted on the client's broadcast channel whenever the active user
/// changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    /// A login committed; `user_id` is now the active user.
    LoggedIn {
        /// Backend id of the user that logged in.
        user_id: String,
    },
    /// The session ended, by request or because the backend revoked it.
    LoggedOut {
        /// Backend id of the user that was active before the logout.
        user_id: String,
    },
}
