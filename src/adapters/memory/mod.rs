//! In-memory store adapters.
//!
//! Same lifecycle checks as the Postgres adapters, held behind a single
//! lock per store so every check-then-write is atomic. Used for local
//! development without a database and throughout the tests.

mod chat_store;
mod memory_store;
mod user_repository;

pub use chat_store::InMemoryChatStore;
pub use memory_store::InMemoryMemoryStore;
pub use user_repository::InMemoryUserRepository;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock helpers that recover from poisoning; a panicked writer cannot leave
/// a half-applied change because every write is a single assignment.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
