//! SyncUserHandler - applies identity-provider user events.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::user::UserRecord;
use crate::ports::{StoreError, UserRepository};

#[derive(Debug, Clone)]
pub enum SyncUserCommand {
    /// `user.created` / `user.updated`
    Upsert(UserRecord),
    /// `user.deleted`
    Remove(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncUserResult {
    Upserted,
    Removed,
    /// A delete arrived for a user we never stored.
    Missing,
}

pub struct SyncUserHandler {
    users: Arc<dyn UserRepository>,
}

impl SyncUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn handle(&self, cmd: SyncUserCommand) -> Result<SyncUserResult, StoreError> {
        match cmd {
            SyncUserCommand::Upsert(user) => {
                self.users.upsert(&user).await?;
                tracing::info!(user_id = %user.id, "User synced");
                Ok(SyncUserResult::Upserted)
            }
            SyncUserCommand::Remove(id) => {
                if self.users.remove(&id).await? {
                    tracing::info!(user_id = %id, "User removed");
                    Ok(SyncUserResult::Removed)
                } else {
                    tracing::warn!(user_id = %id, "Can't delete user, does not exist");
                    Ok(SyncUserResult::Missing)
                }
            }
        }
    }
}
