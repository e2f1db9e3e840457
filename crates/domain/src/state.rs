//! Per-request lifecycle and error categories.
//!
//! Every request moves through [`RequestPhase`]:
//!
//! ```text
//! Initial -> Sent -> Success | AuthFailure | Failure
//! AuthFailure -> Refreshing -> RetrySent | RedirectAndFail | Failure
//! RetrySent -> Success | Failure
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    /// Built but not yet handed to the transport.
    #[default]
    Initial,
    /// First attempt is on the wire.
    Sent,
    /// The API rejected the access token.
    AuthFailure,
    /// Waiting for a token refresh (own or another request's).
    Refreshing,
    /// Resubmitted once with the refreshed token.
    RetrySent,
    /// Completed with a 2xx response.
    Success,
    /// Failed; the error is surfaced to the caller.
    Failure,
    /// Session could not be recovered; credentials cleared and the client
    /// redirected to the unauthenticated entry route.
    RedirectAndFail,
}

impl RequestPhase {
    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initial, Self::Sent)
                | (Self::Sent, Self::Success | Self::AuthFailure | Self::Failure)
                | (Self::AuthFailure, Self::Refreshing)
                | (
                    Self::Refreshing,
                    Self::RetrySent | Self::RedirectAndFail | Self::Failure
                )
                | (Self::RetrySent, Self::Success | Self::Failure)
        )
    }

    /// Returns true for phases with no successor.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::RedirectAndFail)
    }

    /// Returns the snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Sent => "sent",
            Self::AuthFailure => "auth_failure",
            Self::Refreshing => "refreshing",
            Self::RetrySent => "retry_sent",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::RedirectAndFail => "redirect_and_fail",
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of request errors for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestErrorKind {
    /// Invalid URL or path.
    InvalidUrl,

    /// DNS resolution failed.
    DnsError,

    /// Could not establish connection.
    ConnectionFailed,

    /// Connection was refused by the server.
    ConnectionRefused,

    /// Request timed out.
    Timeout,

    /// Invalid request body.
    InvalidBody,

    /// Too many redirects.
    TooManyRedirects,

    /// The session is gone and the user must sign in again.
    SessionExpired,

    /// Unknown or unexpected error.
    Unknown,
}

impl RequestErrorKind {
    /// Returns a human-readable title for this error type.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "Invalid URL",
            Self::DnsError => "DNS Resolution Failed",
            Self::ConnectionFailed => "Connection Failed",
            Self::ConnectionRefused => "Connection Refused",
            Self::Timeout => "Request Timeout",
            Self::InvalidBody => "Invalid Request Body",
            Self::TooManyRedirects => "Too Many Redirects",
            Self::SessionExpired => "Session Expired",
            Self::Unknown => "Unknown Error",
        }
    }

    /// Returns the sentence shown to the user for this error type.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::DnsError | Self::ConnectionFailed | Self::ConnectionRefused => {
                "Unable to reach the server. Please check your connection and try again."
            }
            Self::Timeout => "The server took too long to respond. Please try again.",
            Self::InvalidUrl | Self::InvalidBody => "The request could not be sent.",
            Self::TooManyRedirects => "The server redirected too many times.",
            Self::SessionExpired => "Your session has expired. Please sign in again.",
            Self::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}
