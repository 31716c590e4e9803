pub mod auth;
pub mod exception;

pub use auth::{require_auth, AccessPolicy, AuthGate, AuthUser, GateRejection};
pub use exception::{exception_boundary, ErrorBoundary};
