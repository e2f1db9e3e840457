//! HTTP transport port

use std::future::Future;
use std::sync::Arc;

use tally_domain::{ApiRequest, ApiResponse, RequestErrorKind};
use thiserror::Error;

/// Failures below the HTTP layer: no response was received.
///
/// Any HTTP status, including 401 and 5xx, is a response and never one of
/// these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The URL built from the base URL and the request path is invalid.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be encoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// No response within the timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Host name could not be resolved.
    #[error("could not resolve host {host}: {message}")]
    DnsError {
        /// Host that failed to resolve.
        host: String,
        /// Underlying error text.
        message: String,
    },

    /// The server actively refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// Any other connection-level failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Redirect limit exceeded.
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Configured redirect limit.
        max: usize,
    },

    /// Anything the transport could not classify.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Maps the error to a display category.
    #[must_use]
    pub const fn to_error_kind(&self) -> RequestErrorKind {
        match self {
            Self::InvalidUrl(_) => RequestErrorKind::InvalidUrl,
            Self::InvalidBody(_) => RequestErrorKind::InvalidBody,
            Self::Timeout { .. } => RequestErrorKind::Timeout,
            Self::DnsError { .. } => RequestErrorKind::DnsError,
            Self::ConnectionRefused { .. } => RequestErrorKind::ConnectionRefused,
            Self::ConnectionFailed(_) => RequestErrorKind::ConnectionFailed,
            Self::TooManyRedirects { .. } => RequestErrorKind::TooManyRedirects,
            Self::Other(_) => RequestErrorKind::Unknown,
        }
    }
}

/// Port for sending requests to the remote API.
///
/// Implementations resolve the request path against the API base URL and
/// return whatever the server answered.
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was received.
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).execute(request)
    }
}
