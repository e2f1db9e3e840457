//! Credential store port
//!
//! Defines the interface for persisting the session credentials.

use async_trait::async_trait;
use tally_domain::{DomainError, Session, TokenPair};

/// Errors that can occur during credential storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// I/O error, stringified so the error can be cloned into every waiter
    /// of a failed refresh.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Token update attempted with no session stored.
    #[error("no session is stored")]
    NoSession,

    /// The session to store is incomplete.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Repository trait for the session credentials.
///
/// The access token, refresh token and user profile are stored together.
/// Every mutation is atomic: readers observe either the full old set, the
/// full new set, or nothing.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored session.
    ///
    /// # Returns
    /// `None` when no complete session is stored.
    async fn load(&self) -> Result<Option<Session>, StoreError>;

    /// Replaces the stored session (sign-in).
    ///
    /// # Errors
    /// Returns an error if the session is incomplete or cannot be written.
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Replaces both tokens, keeping the stored profile (refresh).
    ///
    /// # Errors
    /// Returns [`StoreError::NoSession`] if nothing is stored, so a refresh
    /// racing a sign-out cannot resurrect a partial session.
    async fn update_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError>;

    /// Removes all three entries (sign-out or unrecoverable failure).
    ///
    /// # Errors
    /// Returns an error if the entries cannot be removed.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Returns the stored access token.
    async fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load().await?.map(|s| s.access_token))
    }

    /// Returns the stored refresh token.
    async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load().await?.map(|s| s.refresh_token))
    }
}
