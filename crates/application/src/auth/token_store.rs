//! In-memory credential storage.
//!
//! Used by tests and by embedders that keep the session only for the
//! lifetime of the process.

use std::sync::Arc;

use async_trait::async_trait;
use tally_domain::{Session, TokenPair};
use tokio::sync::RwLock;

use crate::ports::{CredentialStore, StoreError};

/// Thread-safe in-memory credential store.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    session: Arc<RwLock<Option<Session>>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(session))),
        }
    }

    /// Returns true if a session is stored.
    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        session.validate()?;
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn update_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        let mut slot = self.session.write().await;
        let updated = slot
            .as_ref()
            .map(|current| current.with_tokens(tokens))
            .ok_or(StoreError::NoSession)?;
        updated.validate()?;
        *slot = Some(updated);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.session.write().await = None;
        Ok(())
    }
}
