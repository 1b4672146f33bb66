//! In-memory user repository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::{read, write};
use crate::domain::foundation::UserId;
use crate::domain::user::UserRecord;
use crate::ports::{StoreError, UserRepository};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, UserRecord>>,
    allowed_emails: RwLock<HashSet<String>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn upsert(&self, user: &UserRecord) -> Result<(), StoreError> {
        write(&self.users).insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(read(&self.users).get(id).cloned())
    }

    async fn remove(&self, id: &UserId) -> Result<bool, StoreError> {
        Ok(write(&self.users).remove(id).is_some())
    }

    async fn is_email_allowed(&self, email: &str) -> Result<bool, StoreError> {
        Ok(read(&self.allowed_emails).contains(&email.to_ascii_lowercase()))
    }

    async fn allow_email(&self, email: &str) -> Result<(), StoreError> {
        write(&self.allowed_emails).insert(email.trim().to_ascii_lowercase());
        Ok(())
    }
}
