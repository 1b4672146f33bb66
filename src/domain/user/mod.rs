//! User module - identity-provider user records and the access policy.
//!
//! User records arrive from the identity provider's webhook. Access to the
//! chat is granted when any *verified* email address passes the allow-list.

mod access;

pub use access::{AccessPolicy, LoginStatus};

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// One email address from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
    pub verified: bool,
}

impl EmailAddress {
    pub fn verified(email: impl Into<String>) -> Self {
        Self {
            email_address: email.into(),
            verified: true,
        }
    }

    pub fn unverified(email: impl Into<String>) -> Self {
        Self {
            email_address: email.into(),
            verified: false,
        }
    }
}

/// A user synced from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: Option<String>,
    pub image_url: Option<String>,
    pub email_addresses: Vec<EmailAddress>,
    pub updated_at: Timestamp,
}

impl UserRecord {
    pub fn new(id: UserId, email_addresses: Vec<EmailAddress>) -> Self {
        Self {
            id,
            first_name: None,
            image_url: None,
            email_addresses,
            updated_at: Timestamp::now(),
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Name shown next to the user's messages and memories.
    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or("")
    }

    /// Verified addresses only; unverified ones never grant access.
    pub fn verified_emails(&self) -> impl Iterator<Item = &str> {
        self.email_addresses
            .iter()
            .filter(|e| e.verified)
            .map(|e| e.email_address.as_str())
    }
}
