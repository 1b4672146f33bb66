//! JWT session validation with a shared HS256 key.
//!
//! Checks the signature and expiry, plus issuer and audience when they are
//! configured, then maps the claims onto the domain `AuthenticatedUser`.
//!
//! ```ignore
//! let validator = JwtSessionValidator::new(JwtConfig::new(secret).with_issuer("https://clerk.example.com"));
//! let user = validator.validate("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Configuration for [`JwtSessionValidator`].
#[derive(Clone)]
pub struct JwtConfig {
    secret: SecretString,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Accepted clock skew in seconds.
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: None,
            audience: None,
            leeway_secs: 60,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Claims we read from a session token.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    /// Identity-provider user id
    sub: String,

    #[serde(default)]
    email: Option<String>,
}

/// Validates HS256 session tokens.
pub struct JwtSessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(config: JwtConfig) -> Self {
        let key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self { key, validation }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!("Token issued for someone else: {}", e);
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.email))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-signing-secret";

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(JwtConfig::new(SECRET))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Accepted Tokens
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_token_maps_subject_and_email() {
        let jwt = token(
            json!({ "sub": "user_2abc", "email": "ada@example.com", "exp": now() + 600 }),
            SECRET,
        );
        let user = validator().validate(&jwt).await.unwrap();
        assert_eq!(user.id.as_str(), "user_2abc");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn email_claim_is_optional() {
        let jwt = token(json!({ "sub": "user_2abc", "exp": now() + 600 }), SECRET);
        let user = validator().validate(&jwt).await.unwrap();
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn issuer_and_audience_are_checked_when_configured() {
        let validator = JwtSessionValidator::new(
            JwtConfig::new(SECRET)
                .with_issuer("https://clerk.example.com")
                .with_audience("chat"),
        );
        let good = token(
            json!({
                "sub": "user_1", "exp": now() + 600,
                "iss": "https://clerk.example.com", "aud": "chat"
            }),
            SECRET,
        );
        let wrong_issuer = token(
            json!({
                "sub": "user_1", "exp": now() + 600,
                "iss": "https://evil.example.com", "aud": "chat"
            }),
            SECRET,
        );
        assert!(validator.validate(&good).await.is_ok());
        assert_eq!(
            validator.validate(&wrong_issuer).await,
            Err(AuthError::InvalidToken)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejected Tokens
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let jwt = token(json!({ "sub": "user_1", "exp": now() - 3600 }), SECRET);
        assert_eq!(validator().validate(&jwt).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_signature_is_invalid() {
        let jwt = token(json!({ "sub": "user_1", "exp": now() + 600 }), "other-secret");
        assert_eq!(validator().validate(&jwt).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert_eq!(
            validator().validate("not.a.jwt").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn blank_subject_is_invalid() {
        let jwt = token(json!({ "sub": "", "exp": now() + 600 }), SECRET);
        assert_eq!(validator().validate(&jwt).await, Err(AuthError::InvalidToken));
    }

    #[test]
    fn debug_redacts_secret() {
        let output = format!("{:?}", JwtConfig::new(SECRET));
        assert!(!output.contains(SECRET));
    }
}
