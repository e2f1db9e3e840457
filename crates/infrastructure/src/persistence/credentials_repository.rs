//! File-based credential store.
//!
//! The session is kept in one JSON file holding three string entries:
//! ```json
//! {
//!   "refreshToken": "eyJ...",
//!   "token": "eyJ...",
//!   "user": "{\"id\":\"u1\",\"name\":\"Ada\",\"email\":\"ada@example.com\",\"role\":\"admin\"}"
//! }
//! ```
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so readers never see a half-written set. The file is readable by
//! its owner only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_application::ports::{CredentialStore, FileSystem, FileSystemError, StoreError};
use tally_domain::{Session, TokenPair, UserProfile};
use tokio::sync::Mutex;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// The three named entries, as stored on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialEntries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl CredentialEntries {
    fn from_session(session: &Session) -> Result<Self, StoreError> {
        Ok(Self {
            refresh_token: Some(session.refresh_token.clone()),
            token: Some(session.access_token.clone()),
            user: Some(session.user.to_storage()?),
        })
    }

    /// All three entries or nothing.
    fn into_session(self) -> Option<Session> {
        let token = self.token.filter(|t| !t.trim().is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.trim().is_empty())?;
        let user = UserProfile::from_storage(self.user.as_deref()?).ok()?;
        Session::new(token, refresh_token, user).ok()
    }
}

fn io_error(e: &FileSystemError) -> StoreError {
    StoreError::Io(e.to_string())
}

/// Credential store backed by a JSON file.
#[derive(Debug)]
pub struct FileCredentialStore<F> {
    fs: F,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl<F: FileSystem> FileCredentialStore<F> {
    /// Creates a store persisting to `path`.
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the credentials file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "credentials".into(), |n| n.to_string_lossy());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::now_v7()))
    }

    async fn read_entries(&self) -> Result<Option<CredentialEntries>, StoreError> {
        match self.fs.read_file(&self.path).await {
            Ok(bytes) => from_json_bytes(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(FileSystemError::NotFound(_)) => Ok(None),
            Err(e) => Err(io_error(&e)),
        }
    }

    async fn write_entries(&self, entries: &CredentialEntries) -> Result<(), StoreError> {
        let content =
            to_json_stable_bytes(entries).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let temp = self.temp_path();

        self.fs
            .write_private(&temp, &content)
            .await
            .map_err(|e| io_error(&e))?;

        if let Err(e) = self.fs.rename(&temp, &self.path).await {
            if let Err(cleanup) = self.fs.remove_file(&temp).await {
                tracing::debug!(error = %cleanup, path = %temp.display(), "failed to remove temp file");
            }
            return Err(io_error(&e));
        }
        Ok(())
    }
}

#[async_trait]
impl<F: FileSystem> CredentialStore for FileCredentialStore<F> {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(entries) = self.read_entries().await? else {
            return Ok(None);
        };
        let session = entries.into_session();
        if session.is_none() {
            tracing::warn!(path = %self.path.display(), "stored credentials are incomplete, ignoring them");
        }
        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        session.validate()?;
        let entries = CredentialEntries::from_session(session)?;

        let _guard = self.write_lock.lock().await;
        self.write_entries(&entries).await?;
        tracing::debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    async fn update_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .read_entries()
            .await?
            .and_then(CredentialEntries::into_session)
            .ok_or(StoreError::NoSession)?;
        let updated = current.with_tokens(tokens);
        updated.validate()?;

        self.write_entries(&CredentialEntries::from_session(&updated)?)
            .await?;
        tracing::debug!(path = %self.path.display(), "tokens updated");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.fs.remove_file(&self.path).await {
            Ok(()) | Err(FileSystemError::NotFound(_)) => Ok(()),
            Err(e) => Err(io_error(&e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::TokioFileSystem;
    use pretty_assertions::assert_eq;
    use tally_domain::UserRole;

    fn session() -> Session {
        Session::new(
            "access-1",
            "refresh-1",
            UserProfile {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: UserRole::Admin,
            },
        )
        .unwrap()
    }

    fn store(dir: &tempfile::TempDir) -> FileCredentialStore<TokioFileSystem> {
        FileCredentialStore::new(TokioFileSystem::new(), dir.path().join("credentials.json"))
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_writes_three_string_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.save(&session()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["token"], "access-1");
        assert_eq!(raw["refreshToken"], "refresh-1");
        let user = UserProfile::from_storage(raw["user"].as_str().unwrap()).unwrap();
        assert_eq!(user.email, "ada@example.com");

        assert_eq!(store.load().await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save(&session()).await.unwrap();
        store
            .update_tokens(&TokenPair {
                token: "access-2".to_string(),
                refresh_token: "refresh-2".to_string(),
            })
            .await
            .unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["credentials.json".to_string()]);
    }

    #[tokio::test]
    async fn test_update_tokens_keeps_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save(&session()).await.unwrap();

        store
            .update_tokens(&TokenPair {
                token: "access-2".to_string(),
                refresh_token: "refresh-2".to_string(),
            })
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-2");
        assert_eq!(loaded.refresh_token, "refresh-2");
        assert_eq!(loaded.user, session().user);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_credentials_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let mode = || std::fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;

        store.save(&session()).await.unwrap();
        assert_eq!(mode(), 0o600);

        store
            .update_tokens(&TokenPair {
                token: "access-2".to_string(),
                refresh_token: "refresh-2".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(mode(), 0o600);
    }

    #[tokio::test]
    async fn test_update_tokens_on_empty_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let result = store
            .update_tokens(&TokenPair {
                token: "a".to_string(),
                refresh_token: "r".to_string(),
            })
            .await;

        assert_eq!(result, Err(StoreError::NoSession));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save(&session()).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.path().exists());

        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_set_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(store.path(), r#"{"token":"access-1","user":"{}"}"#).unwrap();

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.load().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
