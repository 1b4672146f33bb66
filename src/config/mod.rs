//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `CHAT_AT_HOME` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use chat_at_home::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod auth;
mod database;
mod error;
mod server;
mod tools;

pub use ai::AiConfig;
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use tools::ToolsConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; in-memory stores when no URL is set
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Chat and embedding provider
    pub ai: AiConfig,

    /// Optional web search and sandbox back-ends
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Session tokens, sign-in policy and user webhook
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `CHAT_AT_HOME__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_AT_HOME__AI__OPENAI_API_KEY=...` -> `ai.openai_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_AT_HOME")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate(&self.server.environment)?;
        self.ai.validate()?;
        self.tools.validate()?;
        self.auth.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CHAT_AT_HOME__AI__OPENAI_API_KEY",
        "CHAT_AT_HOME__AUTH__JWT_SECRET",
        "CHAT_AT_HOME__AUTH__WEBHOOK_SECRET",
        "CHAT_AT_HOME__DATABASE__URL",
        "CHAT_AT_HOME__SERVER__PORT",
        "CHAT_AT_HOME__SERVER__ENVIRONMENT",
        "CHAT_AT_HOME__TOOLS__TAVILY_API_KEY",
    ];

    fn set_minimal_env() {
        env::set_var("CHAT_AT_HOME__AI__OPENAI_API_KEY", "sk-test");
        env::set_var("CHAT_AT_HOME__AUTH__JWT_SECRET", "jwt-secret");
        env::set_var("CHAT_AT_HOME__AUTH__WEBHOOK_SECRET", "whsec_c2VjcmV0");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_minimal_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ai.chat_model, "gpt-4o");
        assert!(config.database.url().is_none());
        assert!(config.tools.tavily_api_key().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_AT_HOME__AUTH__JWT_SECRET", "jwt-secret");
        env::set_var("CHAT_AT_HOME__AUTH__WEBHOOK_SECRET", "whsec_c2VjcmV0");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_production_requires_database() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("CHAT_AT_HOME__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("DATABASE__URL"))
        );
    }

    #[test]
    fn test_custom_port_and_tools() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("CHAT_AT_HOME__SERVER__PORT", "3000"),
            ("CHAT_AT_HOME__TOOLS__TAVILY_API_KEY", "tvly-test"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.tools.tavily_api_key(), Some("tvly-test"));
    }
}
