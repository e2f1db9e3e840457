//! Port adapters backed by real I/O.

mod redirect_signal;
mod reqwest_transport;

pub use redirect_signal::RedirectSignal;
pub use reqwest_transport::{DEFAULT_REQUEST_TIMEOUT, MAX_REDIRECTS, ReqwestTransport};
