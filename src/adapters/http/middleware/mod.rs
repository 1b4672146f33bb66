//! HTTP middleware for axum.
//!
//! - `auth` - bearer-token validation and the identity extractors
//! - `access` - the sign-in gate for chat routes

pub mod access;
pub mod auth;

pub use access::{require_access, AccessState, CurrentUser};
pub use auth::{auth_middleware, bearer_token, AuthRejection, AuthState, OptionalAuth, RequireAuth};
