//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Declares a UUID-backed identifier with the usual constructors and
/// string conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a conversation.
    ConversationId
);

uuid_id!(
    /// Unique identifier for a chat message (user or assistant).
    MessageId
);

uuid_id!(
    /// Unique identifier for a persisted tool invocation.
    ToolUseId
);

uuid_id!(
    /// Unique identifier for an indexed memory.
    MemoryId
);

uuid_id!(
    /// Unique identifier for an entry in the memory indexing queue.
    IndexJobId
);

/// User identifier issued by the identity provider (the token `sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID_STR: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn conversation_id_parses_and_displays() {
        let id: ConversationId = UUID_STR.parse().unwrap();
        assert_eq!(id.to_string(), UUID_STR);
    }

    #[test]
    fn tool_use_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        assert_eq!(ToolUseId::from_uuid(uuid).as_uuid(), &uuid);
    }

    #[test]
    fn ids_serialize_transparently() {
        let id: MemoryId = UUID_STR.parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", UUID_STR));
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        assert!("not-a-uuid".parse::<MessageId>().is_err());
    }

    #[test]
    fn user_id_accepts_provider_subject() {
        let id = UserId::new("user_2abcXYZ").unwrap();
        assert_eq!(id.as_str(), "user_2abcXYZ");
        assert_eq!(id.to_string(), "user_2abcXYZ");
    }

    #[test]
    fn user_id_rejects_blank() {
        match UserId::new("   ") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "user_id"),
            other => panic!("Expected EmptyField error, got {:?}", other),
        }
    }
}
