//! Wire shapes shared with the remote API.
//!
//! Successful responses come either bare or wrapped in a
//! `{ "success": true, "data": ... }` envelope; failures carry an
//! [`ApiErrorPayload`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::session::{Session, UserProfile};

/// Structured failure body: `{ success: false, message, error?, meta? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorPayload {
    /// Always false for failures.
    #[serde(default)]
    pub success: bool,
    /// Human-readable, machine-stable message.
    pub message: String,
    /// Optional error classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDetail>,
    /// Optional request metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ApiMeta>,
}

impl ApiErrorPayload {
    /// Parses a failure body. Returns `None` for anything that is not a
    /// JSON object with a string `message`.
    #[must_use]
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Server-side request id, when the API reported one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.request_id.as_deref())
    }
}

/// The `error` member of a failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g. `VALIDATION_ERROR`).
    pub code: String,
    /// Free-form details, typically per-field validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The `meta` member of a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMeta {
    /// Correlation id assigned by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped(Envelope<T>),
    Bare(T),
}

/// Decodes a success body, accepting both the enveloped and bare shapes.
///
/// # Errors
///
/// Returns [`DomainError::Decode`] when the body matches neither.
pub fn decode_payload<T: DeserializeOwned>(body: &str) -> DomainResult<T> {
    match serde_json::from_str::<Payload<T>>(body) {
        Ok(Payload::Wrapped(envelope)) => Ok(envelope.data),
        Ok(Payload::Bare(value)) => Ok(value),
        // The untagged error only says "did not match any variant"; the
        // bare attempt gives a more useful message.
        Err(_) => serde_json::from_str::<T>(body).map_err(|e| DomainError::Decode(e.to_string())),
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body of `POST /api/auth/refresh-token` and `POST /api/auth/logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    /// The stored refresh token.
    pub refresh_token: String,
}

/// Success body of `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// New access token.
    pub token: String,
    /// New refresh token.
    pub refresh_token: String,
    /// The signed-in user.
    pub user: UserProfile,
}

impl LoginResponse {
    /// Converts the response into a validated session.
    ///
    /// # Errors
    ///
    /// Returns an error if either token is empty.
    pub fn into_session(self) -> DomainResult<Session> {
        Session::new(self.token, self.refresh_token, self.user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_full_error_payload() {
        let body = json!({
            "success": false,
            "message": "Validation failed",
            "error": { "code": "VALIDATION_ERROR", "details": { "price": "must be positive" } },
            "meta": { "requestId": "req-42" }
        })
        .to_string();

        let payload = ApiErrorPayload::from_body(&body).unwrap();
        assert_eq!(payload.message, "Validation failed");
        assert_eq!(payload.error.as_ref().map(|e| e.code.as_str()), Some("VALIDATION_ERROR"));
        assert_eq!(payload.request_id(), Some("req-42"));
    }

    #[test]
    fn test_non_structured_body_is_not_a_payload() {
        assert!(ApiErrorPayload::from_body("Service Unavailable").is_none());
        assert!(ApiErrorPayload::from_body(r#"{"error":"nope"}"#).is_none());
    }

    #[test]
    fn test_decode_payload_error_message() {
        let result = decode_payload::<RefreshTokenRequest>(r#"{"other":1}"#);
        match result {
            Err(DomainError::Decode(message)) => assert!(message.contains("refreshToken")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_login_response_enveloped() {
        let body = json!({
            "success": true,
            "data": {
                "token": "a1",
                "refreshToken": "r1",
                "user": { "_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "admin" }
            }
        })
        .to_string();

        let session = decode_payload::<LoginResponse>(&body)
            .unwrap()
            .into_session()
            .unwrap();
        assert_eq!(session.access_token, "a1");
        assert_eq!(session.refresh_token, "r1");
        assert_eq!(session.user.id, "u1");
    }

    #[test]
    fn test_login_response_with_empty_token_is_rejected() {
        let body = r#"{"token":"","refreshToken":"r1","user":{"id":"u1","email":"a@b.c","role":"staff"}}"#;
        let response = decode_payload::<LoginResponse>(body).unwrap();
        assert!(matches!(
            response.into_session(),
            Err(DomainError::InvalidSession(_))
        ));
    }

    #[test]
    fn test_refresh_request_wire_name() {
        let body = serde_json::to_value(RefreshTokenRequest {
            refresh_token: "r1".to_string(),
        })
        .unwrap();
        assert_eq!(body, json!({ "refreshToken": "r1" }));
    }
}
