//! Error hierarchy for the Berth SDK.
//!
//! Every fallible operation in the SDK resolves to a [`BerthError`].
//! The variants sort failures into four kinds that callers can act on:
//!
//! - [`DecodeError`] — a bearer token was malformed; local, no network
//! - [`ClientError`] — a local precondition was violated; never retried
//! - [`ServiceError`] — the backend rejected a request (non-2xx)
//! - [`TransportError`] — the request produced no usable response

use http::StatusCode;
use serde::Deserialize;

/// Result alias used across the SDK.
pub type Result<T> = std::result::Result<T, BerthError>;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level error
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the Berth SDK.
#[derive(Debug, thiserror::Error)]
pub enum BerthError {
    /// A bearer token could not be decoded.
    #[error("token decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A local precondition was violated; the request never went out.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The backend rejected the request with a non-success status.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// The request produced no usable response.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// A JSON body could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BerthError {
    /// Whether this error is a backend `InvalidSession` rejection.
    #[must_use]
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Self::Service(service) if service.is_invalid_session())
    }
}

impl From<StorageError> for BerthError {
    fn from(error: StorageError) -> Self {
        Self::Client(ClientError::Storage(error))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error kinds
// ─────────────────────────────────────────────────────────────────────────────

/// A bearer token could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The token did not have the three dot-separated segments of a JWT.
    #[error("expected a three-segment token, found {0} segments")]
    MalformedToken(usize),

    /// The payload segment was not valid base64url.
    #[error("token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload segment was not a valid JSON document.
    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required numeric claim was absent or non-numeric.
    #[error("token payload is missing a numeric `{0}` claim")]
    MissingClaim(&'static str),
}

/// A local precondition was violated.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An authenticated operation was attempted while logged out.
    #[error("must authenticate first")]
    MustAuthenticateFirst,

    /// The caller's user handle no longer matches the active user.
    #[error("user no longer valid")]
    UserNoLongerValid,

    /// Durable storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The persisted session record could not be used.
    #[error("persisted session record is corrupt: {0}")]
    CorruptSession(String),

    /// An in-flight access-token refresh failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] Box<BerthError>),
}

/// The backend rejected a request with a non-success status.
#[derive(Debug, thiserror::Error)]
#[error("service error ({status}): {message}")]
pub struct ServiceError {
    /// HTTP status of the rejected response.
    pub status: StatusCode,
    /// Human-readable description, from the error body when present.
    pub message: String,
    /// Distinguished backend code, when one was supplied.
    pub code: Option<ServiceErrorCode>,
}

/// Backend error codes the SDK reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceErrorCode {
    /// The presented session token is no longer valid.
    InvalidSession,
    /// Any other backend code, carried verbatim.
    Unknown(String),
}

/// The request produced no usable response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request timed out before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// A connection to the backend could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request was malformed before it could be sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read.
    #[error("response body error: {0}")]
    Body(String),

    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Errors from the durable storage capability.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store reported a failure of its own.
    #[error("storage backend error: {0}")]
    Backend(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend error bodies
// ─────────────────────────────────────────────────────────────────────────────

/// Shape of the JSON error body the backend attaches to rejections.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

impl ServiceErrorCode {
    /// Parse a raw backend code string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "InvalidSession" => Self::InvalidSession,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire representation of this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidSession => "InvalidSession",
            Self::Unknown(raw) => raw,
        }
    }
}

impl ServiceError {
    /// Build a [`ServiceError`] from a rejected response.
    ///
    /// The body is decoded as a `{error, error_code}` JSON document when
    /// possible; otherwise the raw text (or the status reason) becomes
    /// the message.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
            if parsed.error.is_some() || parsed.error_code.is_some() {
                return Self {
                    status,
                    message: parsed.error.unwrap_or_else(|| status.to_string()),
                    code: parsed.error_code.as_deref().map(ServiceErrorCode::parse),
                };
            }
        }
        let text = String::from_utf8_lossy(body);
        let message = if text.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            text.into_owned()
        };
        Self {
            status,
            message,
            code: None,
        }
    }

    /// Whether the backend reported an `InvalidSession` code.
    #[must_use]
    pub fn is_invalid_session(&self) -> bool {
        matches!(self.code, Some(ServiceErrorCode::InvalidSession))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
