//! Wiring of the adapters into a ready client.

use std::sync::Arc;

use anyhow::Context;
use tally_application::{AuthenticatedClient, CredentialStore, Navigator, SessionService};
use tally_infrastructure::{
    FileCredentialStore, RedirectSignal, ReqwestTransport, Settings, TokioFileSystem,
};

/// The client type used by the binary.
pub type Client = AuthenticatedClient<ReqwestTransport>;

/// Everything a command needs.
#[derive(Debug)]
pub struct App {
    /// Loaded settings.
    pub settings: Settings,
    /// Authenticated client shared by all commands.
    pub client: Arc<Client>,
    /// Sign-in, sign-out and restore.
    pub sessions: SessionService<ReqwestTransport>,
    /// Redirects issued when the session could not be recovered.
    pub redirects: RedirectSignal,
}

impl App {
    /// Builds the transport, credential store and client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(
            &settings.api.base_url,
            settings.request_timeout(),
            &settings.api.user_agent,
        )
        .with_context(|| format!("invalid API base URL {:?}", settings.api.base_url))?;

        let credentials_path = settings.credentials_path();
        tracing::debug!(path = %credentials_path.display(), "using credentials file");
        let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(
            TokioFileSystem::new(),
            credentials_path,
        ));

        let redirects = RedirectSignal::new();
        let navigator: Arc<dyn Navigator> = Arc::new(redirects.clone());

        let client = Arc::new(AuthenticatedClient::new(
            transport,
            store,
            navigator,
            settings.client_options(),
        ));
        let sessions = SessionService::new(Arc::clone(&client), settings.session_options());

        Ok(Self {
            settings,
            client,
            sessions,
            redirects,
        })
    }

    /// Returns true if a request in this run ended the session.
    #[must_use]
    pub fn session_expired(&self) -> bool {
        self.redirects.redirect_count() > 0
    }
}
