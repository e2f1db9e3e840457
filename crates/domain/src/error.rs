//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request path is empty or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A required header name is invalid.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    /// A required header value is invalid.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A value could not be encoded as JSON.
    #[error("failed to encode JSON: {0}")]
    Encode(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode JSON: {0}")]
    Decode(String),

    /// A stored session entry is malformed.
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
