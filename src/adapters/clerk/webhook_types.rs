//! Clerk webhook payloads.
//!
//! Only the user events are modelled; every other event type is accepted
//! and ignored.

use serde::Deserialize;

use crate::application::handlers::SyncUserCommand;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::user::{EmailAddress, UserRecord};

use super::WebhookError;

/// Email address as Clerk reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkEmailAddress {
    pub email_address: String,
    #[serde(default)]
    pub verification: Option<ClerkVerification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkVerification {
    pub status: String,
}

impl ClerkEmailAddress {
    pub fn is_verified(&self) -> bool {
        self.verification
            .as_ref()
            .is_some_and(|v| v.status == "verified")
    }
}

/// The `data` object of `user.created` / `user.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    /// Unix milliseconds
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// The `data` object of `user.deleted`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedObject {
    #[serde(default)]
    pub id: Option<String>,
}

/// Envelope of every Svix delivery from Clerk.
#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum ClerkWebhookEvent {
    UserCreated(ClerkUser),
    UserUpdated(ClerkUser),
    UserDeleted(DeletedObject),
    /// Any other event type, by name.
    Other(String),
}

impl ClerkWebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload).map_err(invalid)?;
        Ok(match raw.kind.as_str() {
            "user.created" => Self::UserCreated(serde_json::from_value(raw.data).map_err(invalid)?),
            "user.updated" => Self::UserUpdated(serde_json::from_value(raw.data).map_err(invalid)?),
            "user.deleted" => Self::UserDeleted(serde_json::from_value(raw.data).map_err(invalid)?),
            _ => Self::Other(raw.kind),
        })
    }

    /// The sync to apply, or `None` for events we ignore.
    pub fn into_command(self) -> Result<Option<SyncUserCommand>, WebhookError> {
        match self {
            ClerkWebhookEvent::UserCreated(user) | ClerkWebhookEvent::UserUpdated(user) => {
                Ok(Some(SyncUserCommand::Upsert(user.into_record()?)))
            }
            ClerkWebhookEvent::UserDeleted(deleted) => {
                let id = deleted
                    .id
                    .ok_or_else(|| WebhookError::InvalidPayload("user.deleted without id".into()))?;
                Ok(Some(SyncUserCommand::Remove(user_id(id)?)))
            }
            ClerkWebhookEvent::Other(kind) => {
                tracing::debug!(event_type = %kind, "Ignored Clerk webhook event");
                Ok(None)
            }
        }
    }
}

impl ClerkUser {
    pub fn into_record(self) -> Result<UserRecord, WebhookError> {
        let emails = self
            .email_addresses
            .iter()
            .map(|e| EmailAddress {
                email_address: e.email_address.clone(),
                verified: e.is_verified(),
            })
            .collect();
        let mut record = UserRecord::new(user_id(self.id)?, emails);
        record.first_name = self.first_name.filter(|n| !n.is_empty());
        record.image_url = self.image_url.filter(|u| !u.is_empty());
        if let Some(ts) = self
            .updated_at
            .and_then(chrono::DateTime::from_timestamp_millis)
        {
            record.updated_at = Timestamp::from_datetime(ts);
        }
        Ok(record)
    }
}

fn invalid(err: serde_json::Error) -> WebhookError {
    WebhookError::InvalidPayload(err.to_string())
}

fn user_id(id: String) -> Result<UserId, WebhookError> {
    UserId::new(id).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}
