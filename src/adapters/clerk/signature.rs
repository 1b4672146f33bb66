//! Svix webhook signature verification.
//!
//! Signed content is `{svix-id}.{svix-timestamp}.{body}`, signed with
//! HMAC-SHA256 under the base64 key that follows `whsec_` in the secret.
//! The `svix-signature` header carries one or more space-separated
//! `v1,<base64>` entries; any one matching is enough.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Message timestamp too old")]
    TooOld,

    #[error("Message timestamp too new")]
    TooNew,

    #[error("No matching signature found")]
    InvalidSignature,

    #[error("Invalid signing secret")]
    InvalidSecret,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// The three Svix headers, borrowed from the request.
#[derive(Debug, Clone, Copy)]
pub struct SvixHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SvixHeaders<'a> {
    pub fn from_headers(headers: &'a http::HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or(WebhookError::MissingHeader(name))
        };
        Ok(Self {
            id: get("svix-id")?,
            timestamp: get("svix-timestamp")?,
            signature: get("svix-signature")?,
        })
    }
}

pub struct WebhookVerifier {
    key: Secret<Vec<u8>>,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Builds a verifier from a `whsec_<base64>` secret.
    pub fn new(secret: &str, tolerance: Duration) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = BASE64
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self {
            key: Secret::new(key),
            tolerance,
        })
    }

    /// Checks the signature and timestamp of a delivery.
    pub fn verify(&self, headers: &SvixHeaders<'_>, payload: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, payload, chrono::Utc::now().timestamp())
    }

    fn verify_at(
        &self,
        headers: &SvixHeaders<'_>,
        payload: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        // 1. Reject replays outside the tolerance window
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if now.saturating_sub(timestamp) > tolerance {
            tracing::warn!(svix_id = headers.id, age_secs = now - timestamp, "Webhook too old");
            return Err(WebhookError::TooOld);
        }
        if timestamp.saturating_sub(now) > tolerance {
            tracing::warn!(svix_id = headers.id, "Webhook timestamp in the future");
            return Err(WebhookError::TooNew);
        }

        // 2. Compute the expected signature
        let expected = self.sign(headers.id, timestamp, payload)?;

        // 3. Constant-time comparison against every v1 entry
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| BASE64.decode(sig).ok())
            .any(|provided| provided.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 1);

        if matched {
            Ok(())
        } else {
            tracing::warn!(svix_id = headers.id, "Invalid webhook signature");
            Err(WebhookError::InvalidSignature)
        }
    }

    fn sign(&self, id: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret())
            .map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}
