//! # Configuration
//!
//! Application configuration loaded with the `config` crate.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `NEGOTIATION__`-prefixed environment variables, `__` separating
//!    sections, e.g. `NEGOTIATION__ENGINE__STORE_TIMEOUT_MS=2000`
//!
//! A `.env` file is loaded into the environment first when present.

use crate::application::services::EngineConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "NEGOTIATION";

/// Largest accepted `engine.default_validity_days`.
pub const MAX_VALIDITY_DAYS: i64 = 3650;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Postgres settings. Without a URL the in-memory store is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL.
    pub url: Option<String>,
    /// Pool size.
    pub max_connections: u32,
    /// Run embedded migrations on startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret.
    pub jwt_secret: String,
    /// Required `iss` claim, if any.
    pub issuer: Option<String>,
}

/// Listing service settings. Without a URL an empty in-memory lookup is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingsConfig {
    /// Base URL of the listing service.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 2000,
        }
    }
}

/// Notification settings. Without a webhook notifications are only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Webhook receiving notification JSON.
    pub webhook_url: Option<String>,
    /// Bearer token sent to the webhook.
    pub webhook_token: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_token: None,
            timeout_ms: 2000,
        }
    }
}

/// Domain event settings. Without a NATS URL events are only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// NATS server URL; used only with the `nats` feature.
    pub nats_url: Option<String>,
    /// Subject prefix.
    pub subject_prefix: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server.
    pub server: ServerConfig,
    /// Offer store.
    pub database: DatabaseConfig,
    /// Engine tuning.
    pub engine: EngineConfig,
    /// Bearer tokens.
    pub auth: AuthConfig,
    /// Listing lookup.
    pub listings: ListingsConfig,
    /// Notifications.
    pub notifications: NotificationsConfig,
    /// Domain events.
    pub events: EventsConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads `.env`, then the optional file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read, a value has the
    /// wrong type, or [`validate`](Self::validate) fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::Message(format!("failed to load .env: {e}")));
        }

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is invalid.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_VALIDITY_DAYS).contains(&self.engine.default_validity_days) {
            return Err(ConfigError::Message(format!(
                "engine.default_validity_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }
        if self.engine.store_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "engine.store_timeout_ms must be positive".to_string(),
            ));
        }
        if self.engine.max_commit_attempts == 0 {
            return Err(ConfigError::Message(
                "engine.max_commit_attempts must be at least 1".to_string(),
            ));
        }
        if self.engine.expiry_sweep_interval_secs == Some(0) {
            return Err(ConfigError::Message(
                "engine.expiry_sweep_interval_secs must be positive when set".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.engine.default_validity_days, 7);
        assert!(config.database.url.is_none());
        assert!(!config.logging.json);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [engine]
            store_timeout_ms = 1500
            expiry_sweep_interval_secs = 60

            [auth]
            jwt_secret = "dev"
            issuer = "auth.local"

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.engine.store_timeout_ms, 1500);
        assert_eq!(config.engine.notify_timeout_ms, 2000);
        assert_eq!(config.engine.expiry_sweep_interval_secs, Some(60));
        assert_eq!(config.auth.issuer.as_deref(), Some("auth.local"));
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = AppConfig::from_toml_str("[engine]\nmax_commit_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_commit_attempts"));
    }

    #[test]
    fn rejects_out_of_range_validity() {
        let err = AppConfig::from_toml_str("[engine]\ndefault_validity_days = 0\n").unwrap_err();
        assert!(err.to_string().contains("default_validity_days"));

        let huge = format!("[engine]\ndefault_validity_days = {}\n", i64::MAX);
        let err = AppConfig::from_toml_str(&huge).unwrap_err();
        assert!(err.to_string().contains("default_validity_days"));

        let config = AppConfig::from_toml_str("[engine]\ndefault_validity_days = 3650\n").unwrap();
        assert_eq!(config.engine.default_validity_days, MAX_VALIDITY_DAYS);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(AppConfig::from_toml_str("[engine]\nstore_timeout_ms = \"soon\"\n").is_err());
    }
}
