//! Memory pipeline: indexing completed messages and searching them.

mod indexer;
mod search;

pub use indexer::{IndexMemoriesHandler, IndexOutcome};
pub use search::MemorySearch;

use thiserror::Error;

use crate::domain::foundation::{MessageId, UserId};
use crate::ports::{AIError, StoreError};

/// Failures while indexing or searching memories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] AIError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("Message {0} is not complete")]
    MessageNotComplete(MessageId),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
}
