//! Session credentials.
//!
//! A session is the access token, the refresh token and the signed-in
//! user's profile. The three always travel together: a session either
//! exists in full or not at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Role of a dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including settings and branding.
    Admin,
    /// Inventory and sales management.
    Manager,
    /// Day-to-day sales entry.
    Staff,
    /// Any role this client does not know about yet.
    #[serde(untagged)]
    Other(String),
}

impl UserRole {
    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user's identity and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-side user id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Authorization role.
    pub role: UserRole,
}

impl UserProfile {
    /// Serializes the profile for the `user` storage entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_storage(&self) -> DomainResult<String> {
        serde_json::to_string(self).map_err(|e| DomainError::Encode(e.to_string()))
    }

    /// Parses the `user` storage entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not a serialized profile.
    pub fn from_storage(raw: &str) -> DomainResult<Self> {
        serde_json::from_str(raw).map_err(|e| DomainError::InvalidSession(e.to_string()))
    }
}

/// A new access/refresh token pair as returned by the refresh endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// New access token.
    pub token: String,
    /// New refresh token.
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &token_preview(&self.token))
            .field("refresh_token", &token_preview(&self.refresh_token))
            .finish()
    }
}

/// A complete set of session credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Short-lived bearer token.
    #[serde(rename = "token")]
    pub access_token: String,
    /// Longer-lived token used to obtain new access tokens.
    pub refresh_token: String,
    /// The signed-in user.
    pub user: UserProfile,
}

impl Session {
    /// Creates a session, rejecting empty tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if either token is empty.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: UserProfile,
    ) -> DomainResult<Self> {
        let session = Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user,
        };
        session.validate()?;
        Ok(session)
    }

    /// Checks that both tokens are present.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty token.
    pub fn validate(&self) -> DomainResult<()> {
        if self.access_token.trim().is_empty() {
            return Err(DomainError::InvalidSession("access token is empty".to_string()));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(DomainError::InvalidSession("refresh token is empty".to_string()));
        }
        Ok(())
    }

    /// Returns a copy with the tokens replaced and the profile kept.
    #[must_use]
    pub fn with_tokens(&self, pair: &TokenPair) -> Self {
        Self {
            access_token: pair.token.clone(),
            refresh_token: pair.refresh_token.clone(),
            user: self.user.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &token_preview(&self.access_token))
            .field("refresh_token", &token_preview(&self.refresh_token))
            .field("user", &self.user)
            .finish()
    }
}

/// Shortens a token for logs: first 8 chars + `...`.
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((idx, _)) if token.len() > 12 => format!("{}...", &token[..idx]),
        _ => "***".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: UserRole::Manager,
        }
    }

    #[test]
    fn test_login_response_shape() {
        let body = json!({
            "token": "acc",
            "refreshToken": "ref",
            "user": { "_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "manager" }
        });
        let session: Session = serde_json::from_value(body).unwrap();
        assert_eq!(session.access_token, "acc");
        assert_eq!(session.refresh_token, "ref");
        assert_eq!(session.user, profile());
    }

    #[test]
    fn test_unknown_role_is_preserved() {
        let user: UserProfile = serde_json::from_value(
            json!({ "id": "u2", "email": "x@example.com", "role": "auditor" }),
        )
        .unwrap();
        assert_eq!(user.role, UserRole::Other("auditor".to_string()));
        assert_eq!(user.role.to_string(), "auditor");
    }

    #[test]
    fn test_profile_storage_entry() {
        let raw = profile().to_storage().unwrap();
        assert_eq!(UserProfile::from_storage(&raw).unwrap(), profile());
        assert!(UserProfile::from_storage("not json").is_err());
    }

    #[test]
    fn test_session_rejects_empty_tokens() {
        assert!(Session::new("", "r", profile()).is_err());
        assert!(Session::new("a", " ", profile()).is_err());
        assert!(Session::new("a", "r", profile()).is_ok());
    }

    #[test]
    fn test_with_tokens_keeps_profile() {
        let session = Session::new("a1", "r1", profile()).unwrap();
        let refreshed = session.with_tokens(&TokenPair {
            token: "a2".to_string(),
            refresh_token: "r2".to_string(),
        });
        assert_eq!(refreshed.access_token, "a2");
        assert_eq!(refreshed.refresh_token, "r2");
        assert_eq!(refreshed.user, session.user);
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let session = Session::new("secret-access-token-value", "secret-refresh-token", profile())
            .unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-access-token-value"));
        assert!(debug.contains("secret-a..."));
    }
}
