//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Session tokens, sign-in policy and the user webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 key for session tokens
    pub jwt_secret: SecretString,

    /// Expected `iss` claim, if any
    pub jwt_issuer: Option<String>,

    /// Expected `aud` claim, if any
    pub jwt_audience: Option<String>,

    /// Email domain that is admitted without an allow-list entry
    pub allowed_domain: Option<String>,

    /// Svix-style signing secret, `whsec_<base64>`
    pub webhook_secret: SecretString,

    /// Accepted clock skew for webhook timestamps
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,
}

impl AuthConfig {
    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        let webhook = self.webhook_secret.expose_secret();
        if webhook.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__WEBHOOK_SECRET"));
        }
        match webhook.strip_prefix("whsec_") {
            Some(key) if !key.is_empty() => {}
            _ => return Err(ValidationError::InvalidWebhookSecret),
        }
        if self.webhook_tolerance_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_webhook_tolerance() -> u64 {
    300
}
