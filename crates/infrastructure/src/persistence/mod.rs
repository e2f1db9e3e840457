//! File-backed persistence.

mod credentials_repository;
mod file_system;

pub use credentials_repository::FileCredentialStore;
pub use file_system::TokioFileSystem;
