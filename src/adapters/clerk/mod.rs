//! Clerk user webhook adapter.
//!
//! Clerk delivers user lifecycle events through Svix. This module verifies
//! the Svix signature and maps the payload onto `SyncUserCommand`s.

mod signature;
mod webhook_types;

pub use signature::{SvixHeaders, WebhookError, WebhookVerifier};
pub use webhook_types::{
    ClerkEmailAddress, ClerkUser, ClerkVerification, ClerkWebhookEvent, DeletedObject,
};
