//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the client core and the outside
//! world. Each port is a trait implemented by adapters in the
//! infrastructure layer.

mod credential_store;
mod file_system;
mod http_transport;
mod navigator;

pub use credential_store::{CredentialStore, StoreError};
pub use file_system::{FileSystem, FileSystemError};
pub use http_transport::{HttpTransport, TransportError};
pub use navigator::Navigator;
