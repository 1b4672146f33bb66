//! Email allow-list policy.

use serde::{Deserialize, Serialize};

/// Domain-level part of the allow-list. Individual addresses are checked
/// against the allowed-emails table by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed_domain: Option<String>,
}

impl AccessPolicy {
    pub fn new(allowed_domain: Option<String>) -> Self {
        let allowed_domain = allowed_domain
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty());
        Self { allowed_domain }
    }

    /// True if the address belongs to the allowed domain.
    pub fn domain_allows(&self, email: &str) -> bool {
        match &self.allowed_domain {
            Some(domain) => email
                .to_ascii_lowercase()
                .ends_with(&format!("@{}", domain)),
            None => false,
        }
    }
}

/// Result of resolving the current caller, reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginStatus {
    #[serde(rename = "No JWT token")]
    NoJwtToken,
    #[serde(rename = "No Clerk user")]
    NoClerkUser,
    #[serde(rename = "Disallowed email")]
    DisallowedEmail,
    #[serde(rename = "Logged in")]
    LoggedIn,
}

impl LoginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStatus::NoJwtToken => "No JWT token",
            LoginStatus::NoClerkUser => "No Clerk user",
            LoginStatus::DisallowedEmail => "Disallowed email",
            LoginStatus::LoggedIn => "Logged in",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_match_requires_at_sign_boundary() {
        let policy = AccessPolicy::new(Some("example.com".into()));
        assert!(policy.domain_allows("ada@example.com"));
        assert!(policy.domain_allows("Ada@Example.COM"));
        assert!(!policy.domain_allows("ada@notexample.com"));
    }

    #[test]
    fn no_domain_allows_nothing() {
        let policy = AccessPolicy::new(Some("  ".into()));
        assert!(!policy.domain_allows("ada@example.com"));
        assert!(!AccessPolicy::default().domain_allows("ada@example.com"));
    }

    #[test]
    fn status_serializes_as_display_string() {
        let json = serde_json::to_string(&LoginStatus::DisallowedEmail).unwrap();
        assert_eq!(json, "\"Disallowed email\"");
        assert_eq!(LoginStatus::LoggedIn.as_str(), "Logged in");
    }
}
