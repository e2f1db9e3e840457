//! The authenticated API client.
//!
//! Every request gets the stored access token attached. A 401 on a request
//! that has not been retried yet triggers a token refresh (or joins the one
//! already running) and the request is resubmitted once with the new token.
//! When the refresh fails the stored session is cleared and the navigator
//! is sent to the unauthenticated route.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tally_domain::{
    ApiRequest, ApiResponse, HttpMethod, RefreshTokenRequest, RequestPhase, TokenPair,
    token_preview,
};

use super::refresh::{RefreshCoordinator, RefreshOutcome, RefreshTicket};
use crate::error::{ApiError, ApiResult, RefreshFailure};
use crate::ports::{CredentialStore, HttpTransport, Navigator, TransportError};

/// Default refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh-token";

/// Default route for signed-out users.
pub const DEFAULT_UNAUTHENTICATED_ROUTE: &str = "/";

/// Default bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Tunables for [`AuthenticatedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Path of the refresh endpoint.
    pub refresh_path: String,
    /// Route the navigator is sent to when the session cannot be recovered.
    pub unauthenticated_route: String,
    /// Bound on the refresh call; expiry counts as a refresh failure.
    pub refresh_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            unauthenticated_route: DEFAULT_UNAUTHENTICATED_ROUTE.to_string(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

/// Per-request state carried through the retry path.
#[derive(Debug)]
struct RequestContext {
    request: ApiRequest,
    retried: bool,
    phase: RequestPhase,
}

impl RequestContext {
    const fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            phase: RequestPhase::Initial,
        }
    }

    fn advance(&mut self, next: RequestPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid request phase transition {} -> {next}",
            self.phase
        );
        if next.is_terminal() {
            tracing::debug!(request_id = %self.request.id, phase = %next, "request finished");
        } else {
            tracing::trace!(
                request_id = %self.request.id,
                from = %self.phase,
                to = %next,
                "request phase"
            );
        }
        self.phase = next;
    }

    /// Ends the request in `phase` with `error`.
    fn fail(&mut self, phase: RequestPhase, error: ApiError) -> ApiError {
        tracing::debug!(
            request_id = %self.request.id,
            kind = error.kind().title(),
            %error,
            "request failed"
        );
        self.advance(phase);
        error
    }
}

/// HTTP client that attaches the session token and recovers from expired
/// tokens.
///
/// One instance owns one refresh queue; share it behind an `Arc` so all
/// concurrent requests coordinate on the same refresh.
pub struct AuthenticatedClient<T: HttpTransport> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    options: ClientOptions,
    refresh: RefreshCoordinator,
}

impl<T: HttpTransport> AuthenticatedClient<T> {
    /// Creates a client.
    pub fn new(
        transport: T,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        options: ClientOptions,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            options,
            refresh: RefreshCoordinator::new(),
        }
    }

    /// Returns the credential store the client reads tokens from.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Returns the client options.
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns true while a token refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Number of requests waiting for the running refresh.
    pub fn queued_requests(&self) -> usize {
        self.refresh.queued()
    }

    /// Sends `request` with the stored token, refreshing it once on 401.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Status`] for a non-2xx response, including a 401 on the
    ///   resubmitted request.
    /// - [`ApiError::Transport`] when no response was received.
    /// - [`ApiError::Refresh`] when the token could not be refreshed.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        request.validate().map_err(ApiError::InvalidRequest)?;

        let mut ctx = RequestContext::new(request);
        if let Some(token) = self.stored_token().await {
            tracing::trace!(
                request_id = %ctx.request.id,
                token = %token_preview(&token),
                "attaching access token"
            );
            ctx.request.set_bearer(&token);
        }

        loop {
            ctx.advance(if ctx.retried {
                RequestPhase::RetrySent
            } else {
                RequestPhase::Sent
            });

            let response = match self.transport.execute(&ctx.request).await {
                Ok(response) => response,
                Err(error) => return Err(ctx.fail(RequestPhase::Failure, error.into())),
            };

            if response.is_success() {
                ctx.advance(RequestPhase::Success);
                return Ok(response);
            }

            if !response.is_unauthorized() || ctx.retried {
                return Err(ctx.fail(RequestPhase::Failure, ApiError::from_response(response)));
            }

            ctx.retried = true;
            ctx.advance(RequestPhase::AuthFailure);
            tracing::debug!(
                request_id = %ctx.request.id,
                method = %ctx.request.method,
                path = %ctx.request.path,
                "received 401, access token needs refreshing"
            );

            let token = self.obtain_fresh_token(&mut ctx).await?;
            ctx.request.set_bearer(&token);
        }
    }

    /// Sends `request` as-is: no token, no refresh on 401.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for a non-2xx response and
    /// [`ApiError::Transport`] when no response was received.
    pub async fn send_public(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        request.validate().map_err(ApiError::InvalidRequest)?;
        let response = self.transport.execute(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response))
        }
    }

    /// GETs `path` and decodes the body.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedClient::send`]; also [`ApiError::Decode`].
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> ApiResult<R> {
        let response = self.send(ApiRequest::get(path)).await?;
        response.json().map_err(ApiError::Decode)
    }

    /// POSTs `body` to `path` and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedClient::send`]; also [`ApiError::Decode`].
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send_json(HttpMethod::Post, path, body).await
    }

    /// PUTs `body` to `path` and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedClient::send`]; also [`ApiError::Decode`].
    pub async fn put_json<B, R>(&self, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send_json(HttpMethod::Put, path, body).await
    }

    /// PATCHes `path` with `body` and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedClient::send`]; also [`ApiError::Decode`].
    pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send_json(HttpMethod::Patch, path, body).await
    }

    /// DELETEs `path`.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedClient::send`].
    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    async fn send_json<B, R>(&self, method: HttpMethod, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = ApiRequest::new(method, path)
            .with_json(body)
            .map_err(ApiError::InvalidRequest)?;
        let response = self.send(request).await?;
        response.json().map_err(ApiError::Decode)
    }

    async fn stored_token(&self) -> Option<String> {
        match self.store.access_token().await {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(error) => {
                tracing::warn!(%error, "could not read access token, sending unauthenticated");
                None
            }
        }
    }

    /// Leads a refresh or waits for the running one.
    async fn obtain_fresh_token(&self, ctx: &mut RequestContext) -> ApiResult<String> {
        ctx.advance(RequestPhase::Refreshing);

        match self.refresh.join() {
            RefreshTicket::Leader(guard) => {
                tracing::info!(request_id = %ctx.request.id, "refreshing access token");
                let outcome = self.refresh_access_token().await;

                match &outcome {
                    Ok(_) => tracing::info!(
                        queued = self.refresh.queued(),
                        "access token refreshed, resuming queued requests"
                    ),
                    Err(failure) => {
                        tracing::warn!(
                            error = %failure,
                            queued = self.refresh.queued(),
                            "token refresh failed, ending session"
                        );
                        self.end_session().await;
                    }
                }

                guard.settle(&outcome);
                outcome.map_err(|failure| {
                    ctx.fail(RequestPhase::RedirectAndFail, ApiError::Refresh(failure))
                })
            }
            RefreshTicket::Follower(waiter) => {
                tracing::debug!(request_id = %ctx.request.id, "refresh in progress, queueing request");
                let outcome = waiter.await.unwrap_or(Err(RefreshFailure::Abandoned));
                outcome.map_err(|failure| ctx.fail(RequestPhase::Failure, ApiError::Refresh(failure)))
            }
        }
    }

    /// Calls the refresh endpoint and persists the new tokens.
    async fn refresh_access_token(&self) -> RefreshOutcome {
        let refresh_token = match self.store.refresh_token().await {
            Ok(Some(token)) if !token.trim().is_empty() => token,
            Ok(_) => return Err(RefreshFailure::MissingRefreshToken),
            Err(error) => return Err(RefreshFailure::Storage(error)),
        };

        let request = ApiRequest::post(self.options.refresh_path.as_str())
            .with_json(&RefreshTokenRequest { refresh_token })
            .map_err(|e| RefreshFailure::Transport(TransportError::InvalidBody(e.to_string())))?;

        let response = tokio::time::timeout(
            self.options.refresh_timeout,
            self.transport.execute(&request),
        )
        .await
        .map_err(|_| RefreshFailure::TimedOut {
            timeout_ms: u64::try_from(self.options.refresh_timeout.as_millis()).unwrap_or(u64::MAX),
        })?
        .map_err(RefreshFailure::Transport)?;

        if !response.is_success() {
            return Err(RefreshFailure::Rejected {
                status: response.status,
                message: response.error_payload().map(|p| p.message),
            });
        }

        let pair: TokenPair = response
            .json()
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;
        if pair.token.trim().is_empty() || pair.refresh_token.trim().is_empty() {
            return Err(RefreshFailure::InvalidResponse(
                "refresh response is missing a token".to_string(),
            ));
        }

        self.store
            .update_tokens(&pair)
            .await
            .map_err(RefreshFailure::Storage)?;
        Ok(pair.token)
    }

    /// Clears the stored session and redirects to the signed-out route.
    async fn end_session(&self) {
        if let Err(error) = self.store.clear().await {
            tracing::error!(%error, "failed to clear stored credentials");
        }
        tracing::warn!(
            route = %self.options.unauthenticated_route,
            "session expired, redirecting"
        );
        self.navigator.redirect(&self.options.unauthenticated_route);
    }
}

impl<T: HttpTransport> std::fmt::Debug for AuthenticatedClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("options", &self.options)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}
