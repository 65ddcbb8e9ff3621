//! Best-effort bearer-token inspection.
//!
//! The backend issues JWTs; the client only needs their time claims to
//! decide when a refresh is due. [`Jwt::decode`] splits the token,
//! base64url-decodes the payload segment, and pulls out `iat` and
//! `exp`. The signature segment is ignored: the backend verifies
//! tokens, the client merely schedules around them.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::errors::DecodeError;

/// Decoded view of a bearer token's registered time claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Jwt {
    /// `iat` claim: seconds since the epoch when the token was issued.
    pub issued_at: i64,
    /// `exp` claim: seconds since the epoch when the token expires.
    pub expires_at: i64,
}

impl Jwt {
    /// Decode the payload segment of `encoded` without verifying the
    /// signature.
    ///
    /// Requires the standard three-segment shape and numeric `iat` and
    /// `exp` claims; anything else is a [`DecodeError`].
    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        let segments: Vec<&str> = encoded.split('.').collect();
        if segments.len() != 3 {
            return Err(DecodeError::MalformedToken(segments.len()));
        }
        // Tolerate padded variants of base64url.
        let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
        let claims: Value = serde_json::from_slice(&payload)?;
        let issued_at = claims
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or(DecodeError::MissingClaim("iat"))?;
        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(DecodeError::MissingClaim("exp"))?;
        Ok(Self {
            issued_at,
            expires_at,
        })
    }

    /// Whether the token expires within `window` seconds of `now`.
    #[must_use]
    pub fn expires_within(&self, now: i64, window: i64) -> bool {
        self.expires_at <= now + window
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
