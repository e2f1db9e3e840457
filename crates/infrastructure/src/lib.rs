//! Tally Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus layered configuration.

pub mod adapters;
pub mod persistence;
pub mod serialization;
pub mod settings;

pub use adapters::{RedirectSignal, ReqwestTransport};
pub use persistence::{FileCredentialStore, TokioFileSystem};
pub use serialization::{
    SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
pub use settings::{ApiSettings, LogSettings, SessionSettings, Settings};
