//! Application error types and the user-facing error formatter.

use std::error::Error as StdError;

use tally_domain::{ApiErrorPayload, ApiResponse, DomainError, RequestErrorKind};
use thiserror::Error;

use crate::ports::{StoreError, TransportError};

/// Why a token refresh did not produce a new access token.
///
/// One outcome is delivered to every request queued behind the refresh, so
/// this type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// Nothing to refresh with.
    #[error("no refresh token is stored")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-2xx status.
    #[error("refresh token rejected with HTTP {status}")]
    Rejected {
        /// HTTP status of the refresh response.
        status: u16,
        /// Message from the structured error payload, if any.
        message: Option<String>,
    },

    /// The refresh call never got a response.
    #[error("refresh request failed: {0}")]
    Transport(TransportError),

    /// The refresh call exceeded the configured bound.
    #[error("refresh timed out after {timeout_ms}ms")]
    TimedOut {
        /// Bound that elapsed.
        timeout_ms: u64,
    },

    /// The refresh endpoint answered 2xx with an unusable body.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The new tokens could not be persisted.
    #[error("could not persist refreshed tokens: {0}")]
    Storage(StoreError),

    /// The task running the refresh was dropped before it settled.
    #[error("refresh was abandoned before it settled")]
    Abandoned,
}

/// Error returned to callers of the authenticated client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status.
    #[error("request failed with status code {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Structured error body, when the API sent one.
        payload: Option<ApiErrorPayload>,
        /// Raw response body.
        body: String,
    },

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session could not be refreshed.
    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshFailure),

    /// The request was rejected before sending.
    #[error("invalid request: {0}")]
    InvalidRequest(DomainError),

    /// A 2xx body did not match the expected type.
    #[error("failed to decode response: {0}")]
    Decode(DomainError),

    /// The credential store failed.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl ApiError {
    /// Builds a status error from a non-2xx response.
    #[must_use]
    pub fn from_response(response: ApiResponse) -> Self {
        let payload = response.error_payload();
        Self::Status {
            status: response.status,
            payload,
            body: response.body,
        }
    }

    /// Returns the HTTP status for status errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the structured error payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&ApiErrorPayload> {
        match self {
            Self::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the session is gone and the user must sign in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Refresh(_))
    }

    /// Maps the error to a display category.
    #[must_use]
    pub const fn kind(&self) -> RequestErrorKind {
        match self {
            Self::Transport(e) => e.to_error_kind(),
            Self::Refresh(_) => RequestErrorKind::SessionExpired,
            Self::InvalidRequest(_) => RequestErrorKind::InvalidUrl,
            Self::Status { .. } | Self::Decode(_) | Self::Storage(_) => RequestErrorKind::Unknown,
        }
    }

    /// Returns one readable sentence describing the failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                status, payload, ..
            } => payload
                .as_ref()
                .map(|p| p.message.trim())
                .filter(|m| !m.is_empty())
                .map_or_else(|| status_message(*status), str::to_string),
            Self::Transport(e) => e.to_error_kind().user_message().to_string(),
            Self::Refresh(_) => RequestErrorKind::SessionExpired.user_message().to_string(),
            Self::InvalidRequest(e) => format!("The request could not be sent: {e}"),
            Self::Decode(_) => "Received an unexpected response from the server.".to_string(),
            Self::Storage(e) => format!("Could not access saved credentials: {e}"),
        }
    }
}

fn status_message(status: u16) -> String {
    match status {
        401 => RequestErrorKind::SessionExpired.user_message().to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        500..=599 => "The server encountered an error. Please try again later.".to_string(),
        _ => format!("Request failed with status code {status}"),
    }
}

/// Result type alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Turns any error into a single human-readable string.
///
/// - Structured API failures yield the payload's `message`.
/// - Transport failures (no response) yield a fixed network message.
/// - Anything else yields its display text, or a generic fallback when
///   that text is empty.
///
/// The source chain is searched, so wrapped client errors are still
/// recognized.
#[must_use]
pub fn handle_api_error(error: &(dyn StdError + 'static)) -> String {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(api) = err.downcast_ref::<ApiError>() {
            return api.user_message();
        }
        if let Some(transport) = err.downcast_ref::<TransportError>() {
            return transport.to_error_kind().user_message().to_string();
        }
        current = err.source();
    }

    let text = error.to_string();
    if text.trim().is_empty() {
        RequestErrorKind::Unknown.user_message().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status_error(status: u16, body: &str) -> ApiError {
        ApiError::from_response(ApiResponse::new(status, body))
    }

    #[test]
    fn test_structured_payload_message_is_returned_verbatim() {
        let err = status_error(401, r#"{"success":false,"message":"Invalid credentials"}"#);
        assert_eq!(handle_api_error(&err), "Invalid credentials");
    }

    #[test]
    fn test_network_error_has_fallback() {
        let err = ApiError::Transport(TransportError::ConnectionRefused {
            host: "localhost".to_string(),
            port: 5000,
        });
        let message = handle_api_error(&err);
        assert!(!message.is_empty());
        assert_eq!(message, RequestErrorKind::ConnectionRefused.user_message());
    }

    #[test]
    fn test_bare_transport_error() {
        let err = TransportError::Timeout { timeout_ms: 10 };
        assert_eq!(
            handle_api_error(&err),
            RequestErrorKind::Timeout.user_message()
        );
    }

    #[test]
    fn test_non_http_error_still_yields_string() {
        let err = std::io::Error::other("disk on fire");
        assert_eq!(handle_api_error(&err), "disk on fire");

        let silent = std::io::Error::other("");
        assert_eq!(
            handle_api_error(&silent),
            RequestErrorKind::Unknown.user_message()
        );
    }

    #[test]
    fn test_wrapped_api_error_is_found_through_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("loading products")]
        struct Wrapper(#[source] ApiError);

        let err = Wrapper(status_error(
            422,
            r#"{"success":false,"message":"SKU already exists"}"#,
        ));
        assert_eq!(handle_api_error(&err), "SKU already exists");
    }

    #[test]
    fn test_status_without_payload() {
        assert_eq!(
            status_error(418, "teapot").user_message(),
            "Request failed with status code 418"
        );
        assert_eq!(
            status_error(503, "").user_message(),
            "The server encountered an error. Please try again later."
        );
    }

    #[test]
    fn test_refresh_failure_reads_as_session_expired() {
        let err = ApiError::Refresh(RefreshFailure::MissingRefreshToken);
        assert!(err.is_session_expired());
        assert_eq!(err.kind(), RequestErrorKind::SessionExpired);
        assert_eq!(
            handle_api_error(&err),
            RequestErrorKind::SessionExpired.user_message()
        );
    }
}
