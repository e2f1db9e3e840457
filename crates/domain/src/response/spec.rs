//! API response type

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{ApiErrorPayload, decode_payload};
use crate::error::DomainResult;
use crate::request::Headers;

/// HTTP status code for an expired or missing access token.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// A response received from the remote API, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Status text (e.g., "OK", "Unauthorized")
    pub status_text: String,
    /// Response headers
    pub headers: Headers,
    /// Response body as text
    pub body: String,
    /// Round-trip time
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ApiResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true for an authorization-denied response.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    /// Returns true if the status code indicates a client error (4xx).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Returns true if the status code indicates a server error (5xx).
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Decodes the body as `T`, unwrapping a `{ success, data }` envelope
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the body matches neither shape.
    pub fn json<T: DeserializeOwned>(&self) -> DomainResult<T> {
        decode_payload(&self.body)
    }

    /// Parses the structured error payload, if the body carries one.
    #[must_use]
    pub fn error_payload(&self) -> Option<ApiErrorPayload> {
        ApiErrorPayload::from_body(&self.body)
    }
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: Headers::new(),
            body: String::new(),
            duration: Duration::ZERO,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
