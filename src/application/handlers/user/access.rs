//! UserAccessHandler - resolves a caller to a login status.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::domain::user::{AccessPolicy, LoginStatus, UserRecord};
use crate::ports::{StoreError, UserRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Gate in front of every chat operation.
///
/// A caller is let in when a synced user record exists and at least one of
/// its verified emails is on the allow-list.
pub struct UserAccessHandler {
    users: Arc<dyn UserRepository>,
    policy: AccessPolicy,
}

impl UserAccessHandler {
    pub fn new(users: Arc<dyn UserRepository>, policy: AccessPolicy) -> Self {
        Self { users, policy }
    }

    /// Login status for an optional identity.
    pub async fn status(
        &self,
        identity: Option<&AuthenticatedUser>,
    ) -> Result<LoginStatus, StoreError> {
        let Some(identity) = identity else {
            return Ok(LoginStatus::NoJwtToken);
        };
        let Some(user) = self.users.find(&identity.id).await? else {
            return Ok(LoginStatus::NoClerkUser);
        };
        if self.has_allowed_email(&user).await? {
            Ok(LoginStatus::LoggedIn)
        } else {
            Ok(LoginStatus::DisallowedEmail)
        }
    }

    /// The caller's user record, or the reason they are turned away.
    pub async fn require_user(
        &self,
        identity: &AuthenticatedUser,
    ) -> Result<UserRecord, AccessError> {
        let user = self
            .users
            .find(&identity.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !self.has_allowed_email(&user).await? {
            return Err(AuthError::DisallowedEmail.into());
        }
        Ok(user)
    }

    async fn has_allowed_email(&self, user: &UserRecord) -> Result<bool, StoreError> {
        for email in user.verified_emails() {
            if self.policy.domain_allows(email) || self.users.is_email_allowed(email).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserRepository;
    use crate::domain::foundation::UserId;
    use crate::domain::user::EmailAddress;

    async fn handler_with(user: Option<UserRecord>) -> UserAccessHandler {
        let users = Arc::new(InMemoryUserRepository::new());
        if let Some(user) = user {
            users.upsert(&user).await.unwrap();
        }
        users.allow_email("friend@gmail.com").await.unwrap();
        UserAccessHandler::new(users, AccessPolicy::new(Some("example.com".into())))
    }

    fn identity() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("user_1").unwrap(), None)
    }

    fn user(emails: Vec<EmailAddress>) -> UserRecord {
        UserRecord::new(UserId::new("user_1").unwrap(), emails)
    }

    #[tokio::test]
    async fn missing_identity_has_no_token() {
        let handler = handler_with(None).await;
        assert_eq!(handler.status(None).await.unwrap(), LoginStatus::NoJwtToken);
    }

    #[tokio::test]
    async fn unknown_subject_has_no_user() {
        let handler = handler_with(None).await;
        assert_eq!(
            handler.status(Some(&identity())).await.unwrap(),
            LoginStatus::NoClerkUser
        );
        assert_eq!(
            handler.require_user(&identity()).await.unwrap_err(),
            AccessError::Auth(AuthError::UserNotFound)
        );
    }

    #[tokio::test]
    async fn domain_or_listed_address_is_allowed() {
        let by_domain = handler_with(Some(user(vec![EmailAddress::verified("ada@example.com")]))).await;
        assert_eq!(
            by_domain.status(Some(&identity())).await.unwrap(),
            LoginStatus::LoggedIn
        );

        let listed = handler_with(Some(user(vec![EmailAddress::verified("friend@gmail.com")]))).await;
        assert!(listed.require_user(&identity()).await.is_ok());
    }

    #[tokio::test]
    async fn unverified_address_does_not_count() {
        let handler =
            handler_with(Some(user(vec![EmailAddress::unverified("ada@example.com")]))).await;
        assert_eq!(
            handler.status(Some(&identity())).await.unwrap(),
            LoginStatus::DisallowedEmail
        );
        assert_eq!(
            handler.require_user(&identity()).await.unwrap_err(),
            AccessError::Auth(AuthError::DisallowedEmail)
        );
    }
}
