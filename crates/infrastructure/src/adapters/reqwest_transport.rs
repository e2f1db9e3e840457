//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It resolves API paths
//! against the configured base URL and reports every HTTP status as a
//! response; only failures below HTTP become errors.

use std::error::Error as StdError;
use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder};
use tally_application::ports::{HttpTransport, TransportError};
use tally_domain::{ApiRequest, ApiResponse, Header, Headers, HttpMethod};
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport for the API at `base_url`.
    ///
    /// Configuration:
    /// - Follow redirects: up to [`MAX_REDIRECTS`]
    /// - TLS verification: enabled
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL or
    /// the client cannot be created.
    pub fn new(
        base_url: &str,
        default_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Self::with_client(client, base_url, default_timeout)
    }

    /// Creates a transport around an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn with_client(
        client: Client,
        base_url: &str,
        default_timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            default_timeout,
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the full URL for `request`.
    ///
    /// The request path is appended to the base path, so a base of
    /// `https://host/v1` and a path of `/api/products` give
    /// `https://host/v1/api/products`. The result always has the base
    /// URL's origin.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] for a path that names its own
    /// host or lacks a leading slash.
    pub fn resolve_url(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        if request.is_absolute() || !request.path.starts_with('/') {
            return Err(TransportError::InvalidUrl(format!(
                "path must be relative to {}: {}",
                self.base_url, request.path
            )));
        }

        let (path, query) = request
            .path
            .split_once('?')
            .map_or((request.path.as_str(), None), |(p, q)| (p, Some(q)));
        let mut url = self.base_url.clone();
        let joined = format!("{}{path}", self.base_url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(query);

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for param in request.query.iter() {
                pairs.append_pair(&param.key, &param.value);
            }
        }

        Ok(url)
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn prepare(&self, request: &ApiRequest) -> Result<(RequestBuilder, u64), TransportError> {
        let url = self.resolve_url(request)?;
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(timeout);

        for header in request.headers.iter() {
            builder = builder.header(&header.name, &header.value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok((builder, timeout_ms))
    }

    /// Maps reqwest errors to the port's `TransportError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        let host = || {
            error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string()
        };

        if error.is_connect() {
            let message = error_chain(error);
            let lower = message.to_lowercase();
            if lower.contains("dns") || lower.contains("resolve") {
                return TransportError::DnsError {
                    host: host(),
                    message,
                };
            }
            if lower.contains("refused") {
                return TransportError::ConnectionRefused {
                    host: host(),
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            return TransportError::ConnectionFailed(message);
        }

        if error.is_redirect() {
            return TransportError::TooManyRedirects { max: MAX_REDIRECTS };
        }

        if error.is_builder() {
            return TransportError::InvalidUrl(error_chain(error));
        }

        TransportError::Other(error_chain(error))
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        let prepared = self.prepare(request);
        let request_id = request.id;
        let method = request.method;

        async move {
            let (builder, timeout_ms) = prepared?;
            let start = Instant::now();

            let response = builder.send().await.map_err(|e| {
                let mapped = Self::map_error(&e, timeout_ms);
                tracing::debug!(%request_id, %method, error = %mapped, "request failed");
                mapped
            })?;

            let status = response.status();
            let headers: Headers = response
                .headers()
                .iter()
                .map(|(k, v)| Header::new(k.as_str(), v.to_str().unwrap_or("<binary>")))
                .collect();

            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Other(format!("Failed to read body: {e}")))?;
            let duration = start.elapsed();

            tracing::debug!(
                %request_id,
                %method,
                status = status.as_u16(),
                elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "response received"
            );

            Ok(ApiResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
                duration,
            })
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| TransportError::InvalidUrl(format!("{e}: {raw}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(TransportError::InvalidUrl(format!(
            "base URL must be an http(s) URL: {raw}"
        )));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Joins an error and its sources into one line.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
