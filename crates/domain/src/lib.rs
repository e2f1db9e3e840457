//! Tally Domain - Core types for the dashboard API client
//!
//! This crate defines requests, responses, session credentials and the
//! API's wire shapes. All types here are pure Rust with no I/O.

pub mod api;
pub mod error;
pub mod id;
pub mod request;
pub mod response;
pub mod session;
pub mod state;

pub use api::{
    ApiErrorDetail, ApiErrorPayload, ApiMeta, LoginRequest, LoginResponse, RefreshTokenRequest,
    decode_payload,
};
pub use error::{DomainError, DomainResult};
pub use id::generate_request_id;
pub use request::{ApiRequest, Header, Headers, HttpMethod, QueryParam, QueryParams};
pub use response::{ApiResponse, STATUS_UNAUTHORIZED};
pub use session::{Session, TokenPair, UserProfile, UserRole, token_preview};
pub use state::{RequestErrorKind, RequestPhase};
