//! Gateway configuration.
//!
//! Loaded once at startup from a YAML file (`-c/--config`) or from
//! environment variables, `.env` included. The configuration is immutable
//! afterwards and shared by reference through the application state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("cannot parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is present but out of range
    #[error("invalid configuration value for {field}: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },
}

/// Channel-transport behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Whether a failed channel dispatch is echoed back to the client as
    /// an error frame. When false, failures are only logged.
    pub error_replies: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            error_replies: true,
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface the server binds to
    pub host: String,
    /// Port the server binds to
    pub port: u16,
    /// Comma-separated CORS origins, `*` for any; same-origin only when
    /// unset
    pub cors_allowed_origins: Option<String>,
    /// Channel-transport behavior
    pub channel: ChannelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7512,
            cors_allowed_origins: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()
    }

    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    ///
    /// Factored out of [`ServerConfig::from_env`] so tests can inject
    /// variables without touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup("GATEWAY_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("GATEWAY_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                field: "port",
                message: format!("not a port number: {port}"),
            })?;
        }
        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(replies) = lookup("CHANNEL_ERROR_REPLIES") {
            config.channel.error_replies = replies.parse().map_err(|_| ConfigError::Invalid {
                field: "channel.error_replies",
                message: format!("not a boolean: {replies}"),
            })?;
        }

        config.validate()
    }

    /// Socket address string the server binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                message: "host must not be empty".to_string(),
            });
        }
        Ok(self)
    }
}
