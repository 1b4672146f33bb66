//! PostgreSQL adapters - sqlx implementations of the store ports.
//!
//! - `PostgresChatStore` - conversations, messages and tool uses
//! - `PostgresMemoryStore` - indexing queue and `float8[]` embeddings
//! - `PostgresUserRepository` - synced users and the email allow-list

mod chat_store;
mod memory_store;
mod user_repository;

pub use chat_store::PostgresChatStore;
pub use memory_store::PostgresMemoryStore;
pub use user_repository::PostgresUserRepository;

use crate::ports::StoreError;

/// Maps a sqlx failure to `StoreError::Database` naming what was attempted.
fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::database(format!("Failed to {}: {}", action, e))
}
