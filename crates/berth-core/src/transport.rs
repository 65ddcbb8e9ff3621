//! HTTP transport capability.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::request::{Request, Response};

/// Performs a single HTTP round trip.
///
/// Implementations resolve [`Request::path`] against their configured
/// base URL and return the complete response, non-success statuses
/// included. A returned [`TransportError`] means no usable response was
/// produced at all; it is never a backend rejection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request` and return the complete response.
    async fn round_trip(&self, request: &Request) -> Result<Response, TransportError>;
}
