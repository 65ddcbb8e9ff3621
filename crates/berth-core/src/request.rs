//! Immutable request descriptors and the response model.
//!
//! A [`Request`] is built once, stamped with the wall-clock time of its
//! construction, and never mutated afterwards; retries resubmit the
//! same descriptor. Responses come back whole, body included, so the
//! retry protocol can inspect errors without re-reading a stream.

use std::borrow::Cow;

use chrono::Utc;
use http::header::{AUTHORIZATION, CONTENT_TYPE, InvalidHeaderValue};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::ServiceError;

/// Which session token authorizes a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Authorize with the short-lived access token (the default).
    #[default]
    Access,
    /// Authorize with the long-lived refresh token. Only the session
    /// routes (token refresh, logout) use this.
    Refresh,
}

/// A single HTTP request against the backend.
///
/// `path` is relative to the transport's base URL. The `started_at`
/// stamp records when the descriptor was built; the retry protocol
/// compares it against token issue times to skip redundant refreshes.
#[derive(Clone, Debug)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path (plus query) relative to the backend base URL.
    pub path: String,
    /// Headers to send, bearer authorization included once attached.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
    /// Seconds since the epoch when this descriptor was built.
    pub started_at: i64,
    /// Which session token authorizes the request.
    pub token_policy: TokenPolicy,
}

impl Request {
    /// Start building a request for `method` and `path`.
    #[must_use]
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            token_policy: TokenPolicy::default(),
        }
    }

    /// A copy of this request carrying `token` as its bearer credential.
    pub fn with_bearer(&self, token: &str) -> Result<Self, InvalidHeaderValue> {
        let mut request = self.clone();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        let _ = request.headers.insert(AUTHORIZATION, value);
        Ok(request)
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    token_policy: TokenPolicy,
}

impl RequestBuilder {
    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        let _ = self.headers.insert(name, value);
        self
    }

    /// Set a JSON body and the matching content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        let _ = self
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Set a raw body.
    #[must_use]
    pub fn body(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(bytes);
        self
    }

    /// Choose which session token authorizes the request.
    #[must_use]
    pub fn token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Finish the descriptor, stamping it with the current time.
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            headers: self.headers,
            body: self.body,
            started_at: Utc::now().timestamp(),
            token_policy: self.token_policy,
        }
    }
}

/// A complete HTTP response, body already read.
#[derive(Clone, Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Pass a successful response through, or convert a rejection into
    /// the [`ServiceError`] its body describes.
    pub fn check_status(self) -> Result<Self, ServiceError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ServiceError::from_response(self.status, &self.body))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
