//! Tally Application - Authenticated client and ports
//!
//! This crate defines the application layer with:
//! - Port traits (transport, credential store, navigator)
//! - The authenticated client and refresh coordination
//! - Application-level error handling

pub mod auth;
pub mod error;
pub mod ports;

pub use auth::{
    AuthenticatedClient, ClientOptions, MemoryCredentialStore, SessionOptions, SessionService,
};
pub use error::{ApiError, ApiResult, RefreshFailure, handle_api_error};
pub use ports::{
    CredentialStore, FileSystem, FileSystemError, HttpTransport, Navigator, StoreError,
    TransportError,
};
