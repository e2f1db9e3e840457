//! Authenticated access to the remote API.
//!
//! This module provides:
//! - The authenticated client with transparent token refresh
//! - Single-flight refresh coordination
//! - The session lifecycle (sign-in, sign-out, restore)
//! - In-memory credential storage

mod client;
mod refresh;
mod session;
mod token_store;

pub use client::{
    AuthenticatedClient, ClientOptions, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_TIMEOUT,
    DEFAULT_UNAUTHENTICATED_ROUTE,
};
pub use refresh::{LeaderGuard, RefreshCoordinator, RefreshOutcome, RefreshTicket};
pub use session::{DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH, SessionOptions, SessionService};
pub use token_store::MemoryCredentialStore;
