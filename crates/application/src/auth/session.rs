//! Sign-in, sign-out and session restore.

use std::sync::Arc;

use tally_domain::{
    ApiRequest, LoginRequest, LoginResponse, RefreshTokenRequest, Session, UserProfile,
};

use super::client::AuthenticatedClient;
use crate::error::{ApiError, ApiResult};
use crate::ports::HttpTransport;

/// Default sign-in endpoint.
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login";

/// Default sign-out endpoint.
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout";

/// Endpoint paths used by [`SessionService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Path of the sign-in endpoint.
    pub login_path: String,
    /// Path of the sign-out endpoint.
    pub logout_path: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
        }
    }
}

/// Session lifecycle on top of an [`AuthenticatedClient`].
#[derive(Debug)]
pub struct SessionService<T: HttpTransport> {
    client: Arc<AuthenticatedClient<T>>,
    options: SessionOptions,
}

impl<T: HttpTransport> SessionService<T> {
    /// Creates a session service sharing `client`'s credential store.
    pub const fn new(client: Arc<AuthenticatedClient<T>>, options: SessionOptions) -> Self {
        Self { client, options }
    }

    /// Signs in and persists the returned credentials as one session.
    ///
    /// A 401 here means bad credentials and is returned as a plain
    /// [`ApiError::Status`]; it never triggers a refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the credentials, the response is
    /// incomplete, or the session cannot be stored.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Session> {
        let request = ApiRequest::post(self.options.login_path.as_str())
            .with_json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .map_err(ApiError::InvalidRequest)?;

        let response = self.client.send_public(request).await?;
        let session = response
            .json::<LoginResponse>()
            .and_then(LoginResponse::into_session)
            .map_err(ApiError::Decode)?;

        self.client.credentials().save(&session).await?;
        tracing::info!(user = %session.user.email, role = %session.user.role, "signed in");
        Ok(session)
    }

    /// Signs out: tells the API (best effort), then clears the credentials.
    ///
    /// # Errors
    ///
    /// Returns an error only if the stored credentials cannot be removed.
    pub async fn logout(&self) -> ApiResult<()> {
        let store = self.client.credentials();

        match store.refresh_token().await {
            Ok(Some(refresh_token)) => {
                let notify = ApiRequest::post(self.options.logout_path.as_str())
                    .with_json(&RefreshTokenRequest { refresh_token })
                    .map_err(ApiError::InvalidRequest);
                let result = match notify {
                    Ok(request) => self.client.send(request).await.map(drop),
                    Err(error) => Err(error),
                };
                if let Err(error) = result {
                    tracing::warn!(%error, "server-side sign-out failed, clearing local session anyway");
                }
            }
            Ok(None) => tracing::debug!("no stored session to sign out of"),
            Err(error) => tracing::warn!(%error, "could not read stored session"),
        }

        store.clear().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Loads the stored session on startup.
    ///
    /// An incomplete stored set restores nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn restore(&self) -> ApiResult<Option<Session>> {
        let session = self
            .client
            .credentials()
            .load()
            .await?
            .filter(|s| s.validate().is_ok());
        match &session {
            Some(s) => tracing::debug!(user = %s.user.email, "restored stored session"),
            None => tracing::debug!("no stored session"),
        }
        Ok(session)
    }

    /// Returns the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn current_user(&self) -> ApiResult<Option<UserProfile>> {
        Ok(self.restore().await?.map(|s| s.user))
    }

    /// Returns the underlying client.
    pub const fn client(&self) -> &Arc<AuthenticatedClient<T>> {
        &self.client
    }
}
