//! Reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use berth_core::{Request, Response, Transport, TransportError};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Transport`] over a shared [`reqwest::Client`].
///
/// Resolves request paths against a fixed base URL. Cloning shares the
/// underlying connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build a transport for `base_url` with the default timeout and
    /// SDK user agent.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("berth-sdk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build over an existing client, for hosts that configure proxies
    /// or share a connection pool.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed);
        Self { client, base_url }
    }

    /// The configured base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn map_reqwest_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_request() {
        TransportError::InvalidRequest(error.to_string())
    } else if error.is_body() || error.is_decode() {
        TransportError::Body(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e))?
            .to_vec();
        debug!(%status, bytes = body.len(), "received response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use berth_core::TokenPolicy;

    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = reqwest::Client::new();
        let transport = ReqwestTransport::with_client(client, "https://example.com///");
        assert_eq!(transport.base_url(), "https://example.com");
        assert_eq!(
            transport.url_for("/a/b"),
            "https://example.com/a/b"
        );
        assert_eq!(transport.url_for("a/b"), "https://example.com/a/b");
    }

    #[tokio::test]
    async fn round_trip_sends_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"username": "ada"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(server.uri()).unwrap();
        let request = Request::builder(Method::POST, "/login")
            .json(&json!({"username": "ada"}))
            .unwrap()
            .build()
            .with_bearer("tok")
            .unwrap();

        let response = transport.round_trip(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn round_trip_returns_rejections_as_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(server.uri()).unwrap();
        let request = Request::builder(Method::GET, "/missing").build();

        // Non-success statuses are responses, not transport errors.
        let response = transport.round_trip(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "gone");
    }

    #[tokio::test]
    async fn connection_failure_maps_to_a_transport_error() {
        // Nothing listens on this port.
        let transport = ReqwestTransport::new("http://127.0.0.1:1").unwrap();
        let request = Request::builder(Method::GET, "/x")
            .token_policy(TokenPolicy::Access)
            .build();

        let error = transport.round_trip(&request).await.unwrap_err();
        assert!(matches!(
            error,
            TransportError::Connect(_) | TransportError::Other(_)
        ));
    }
}
