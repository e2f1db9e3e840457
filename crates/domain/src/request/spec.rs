//! API request type

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::header::AUTHORIZATION;
use super::{Header, Headers, HttpMethod, QueryParam, QueryParams};
use crate::error::{DomainError, DomainResult};
use crate::id::generate_request_id;

/// A request against the remote API.
///
/// `path` is relative to the configured base URL (`/api/products`). Full
/// URLs are rejected so the session token never leaves the API origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Unique identifier for this request, used in logs.
    pub id: Uuid,
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base URL
    pub path: String,
    /// Query parameters appended to the URL
    #[serde(default)]
    pub query: QueryParams,
    /// HTTP headers
    #[serde(default)]
    pub headers: Headers,
    /// Optional JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Per-request timeout; the transport default applies when unset.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Creates a request with the given method and path.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: generate_request_id(),
            method,
            path: path.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            body: None,
            timeout: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Creates a PUT request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Creates a PATCH request.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(Header::new(name, value));
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.add(QueryParam::new(key, value));
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn with_json<B: Serialize>(mut self, body: &B) -> DomainResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| DomainError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Sets `Authorization: Bearer <token>`, replacing any previous value.
    pub fn set_bearer(&mut self, token: &str) {
        let header = Header::bearer(token);
        self.headers.set(AUTHORIZATION, header.value);
    }

    /// Returns the current `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION)
    }

    /// Returns true if the path names its own host (`https://..`, `//host/..`).
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        let path = self.path.trim_start();
        path.starts_with("//")
            || path.split_once(':').is_some_and(|(scheme, _)| {
                !scheme.is_empty()
                    && scheme
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b"+-.".contains(&b))
            })
    }

    /// Validates the path and headers before sending.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty path, a full URL, a path without a
    /// leading slash, or an invalid header.
    pub fn validate(&self) -> DomainResult<()> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err(DomainError::InvalidPath("path is required".to_string()));
        }
        if self.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "path must be relative to the API base URL: {path}"
            )));
        }
        if !path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "path must start with '/': {path}"
            )));
        }
        self.headers.iter().try_for_each(Header::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let request = ApiRequest::get("/api/products")
            .with_query("page", "1")
            .with_header("Accept", "application/json");

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.path, "/api/products");
        assert_eq!(request.query.iter().count(), 1);
        assert_eq!(request.headers.get("accept"), Some("application/json"));
    }

    #[test]
    fn test_set_bearer_replaces_existing() {
        let mut request =
            ApiRequest::get("/api/sales").with_header("authorization", "Bearer stale");
        request.set_bearer("fresh");

        assert_eq!(request.authorization(), Some("Bearer fresh"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_with_json() {
        let request = ApiRequest::post("/api/products")
            .with_json(&json!({ "name": "Widget", "stock": 4 }))
            .expect("json body");
        assert_eq!(request.body, Some(json!({ "name": "Widget", "stock": 4 })));
    }

    #[test]
    fn test_validate_paths() {
        assert!(ApiRequest::get("/api/products").validate().is_ok());
        assert!(ApiRequest::get("/api/products?page=2").validate().is_ok());
        assert!(
            ApiRequest::get("/api/redirect?next=https://example.com")
                .validate()
                .is_ok()
        );
        assert!(matches!(
            ApiRequest::get("api/products").validate(),
            Err(DomainError::InvalidPath(_))
        ));
        assert!(matches!(
            ApiRequest::get("  ").validate(),
            Err(DomainError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_validate_rejects_other_hosts() {
        for path in [
            "https://cdn.example.com/a.png",
            "http://localhost:5000/api/products",
            "//attacker.example/collect",
            " https://attacker.example/collect",
        ] {
            assert!(
                matches!(
                    ApiRequest::get(path).validate(),
                    Err(DomainError::InvalidPath(_))
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_each_request_gets_its_own_id() {
        assert_ne!(ApiRequest::get("/a").id, ApiRequest::get("/a").id);
    }
}
