//! Authentication types for the domain layer.
//!
//! These types represent an authenticated caller extracted from a bearer
//! token. Any identity provider can populate them via the
//! `SessionValidator` port; access is then narrowed by the email
//! allow-list in `domain::user`.

use super::UserId;
use thiserror::Error;

/// Caller identity extracted from a validated JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Identity provider subject.
    pub id: UserId,

    /// Email claim, if the token carries one.
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Option<String>) -> Self {
        Self { id, email }
    }
}

/// Authentication errors that can occur while resolving the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("No JWT token")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but no synced user record exists for the subject.
    #[error("No Clerk user")]
    UserNotFound,

    /// The user exists but none of their verified emails is allowed.
    #[error("Disallowed email")]
    DisallowedEmail,

    /// The authentication backend could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if the caller should sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_login_states() {
        assert_eq!(AuthError::MissingToken.to_string(), "No JWT token");
        assert_eq!(AuthError::UserNotFound.to_string(), "No Clerk user");
        assert_eq!(AuthError::DisallowedEmail.to_string(), "Disallowed email");
    }

    #[test]
    fn reauthentication_only_for_token_problems() {
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::DisallowedEmail.requires_reauthentication());
        assert!(!AuthError::service_unavailable("down").requires_reauthentication());
    }
}
