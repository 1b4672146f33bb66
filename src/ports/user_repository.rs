//! User repository port - synced identity-provider users and the
//! allowed-emails table.

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::domain::user::UserRecord;

use super::StoreError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts or replaces the user with the same id.
    async fn upsert(&self, user: &UserRecord) -> Result<(), StoreError>;

    async fn find(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Returns whether a user was removed.
    async fn remove(&self, id: &UserId) -> Result<bool, StoreError>;

    /// True if the exact address is in the allowed-emails table.
    async fn is_email_allowed(&self, email: &str) -> Result<bool, StoreError>;

    async fn allow_email(&self, email: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_repository_is_object_safe() {
        fn _accepts_dyn(_: &dyn UserRepository) {}
    }
}
