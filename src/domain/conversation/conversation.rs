//! Conversation aggregate root.
//!
//! A conversation owns its messages. Its display name is filled in lazily
//! by auto-titling exactly once; after that only an explicit rename by the
//! creator changes it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};

/// Upper bound on generated title length, in words.
pub const MAX_TITLE_WORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    name: Option<String>,
    creator_id: UserId,
    created_at: Timestamp,
}

impl Conversation {
    /// Creates a conversation, optionally already named.
    pub fn new(creator_id: UserId, name: Option<String>) -> Self {
        Self {
            id: ConversationId::new(),
            name: name.and_then(|n| normalize_name(&n)),
            creator_id,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a conversation from persistence (no validation).
    pub fn reconstitute(
        id: ConversationId,
        name: Option<String>,
        creator_id: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            creator_id,
            created_at,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn creator_id(&self) -> &UserId {
        &self.creator_id
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// True while no non-empty name has been set.
    pub fn needs_title(&self) -> bool {
        self.name.is_none()
    }

    /// Sets a generated title if the conversation is still unnamed.
    ///
    /// Returns whether the title was applied.
    pub fn apply_generated_title(&mut self, title: &str) -> bool {
        if !self.needs_title() {
            return false;
        }
        match clamp_title(title) {
            Some(title) => {
                self.name = Some(title);
                true
            }
            None => false,
        }
    }

    /// Explicit rename by the user; always overwrites.
    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        let name = normalize_name(name)
            .ok_or_else(|| DomainError::validation("name", "Name cannot be empty"))?;
        self.name = Some(name);
        Ok(())
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.creator_id == user
    }

    /// Rejects callers other than the creator.
    pub fn ensure_owned_by(&self, user: &UserId) -> Result<(), DomainError> {
        if self.is_owned_by(user) {
            Ok(())
        } else {
            Err(DomainError::new(ErrorCode::Forbidden, "Not authorized")
                .with_detail("conversation_id", self.id.to_string()))
        }
    }
}

fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trims a generated title and keeps at most [`MAX_TITLE_WORDS`] words.
///
/// Returns `None` when nothing usable is left.
pub fn clamp_title(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .map(|w| w.trim_matches('"'))
        .filter(|w| !w.is_empty())
        .take(MAX_TITLE_WORDS)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
