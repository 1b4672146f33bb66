//! User handlers - identity-provider sync and the login gate.

mod access;
mod sync_user;

pub use access::{AccessError, UserAccessHandler};
pub use sync_user::{SyncUserCommand, SyncUserHandler, SyncUserResult};
