//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};
use wa_router_core::ForwarderConfig;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Inbound webhook settings
    pub webhook: WebhookConfig,

    /// Outbound forwarding settings
    pub forwarding: ForwardingConfig,

    /// Resolution cache settings
    pub cache: CacheConfig,

    /// Routing table source
    pub routing: RoutingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.shutdown_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.shutdown_timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        let prefix = &self.webhook.path_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.path_prefix must start with '/' and not end with '/', got '{}'",
                    prefix
                ),
            });
        }

        if self.forwarding.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "forwarding.timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.forwarding.user_agent.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "forwarding.user_agent".to_string(),
            });
        }

        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "cache.ttl_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Inbound webhook configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Token the provider echoes during the verification handshake.
    ///
    /// An empty token rejects every handshake.
    pub verify_token: String,

    /// Path the per-vendor endpoints are mounted under
    pub path_prefix: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            path_prefix: "/webhook/meta".to_string(),
        }
    }
}

// Security: Don't expose the verify token in debug output
impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field(
                "verify_token",
                &if self.verify_token.is_empty() {
                    "<unset>"
                } else {
                    "<REDACTED>"
                },
            )
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

/// Outbound forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Bound on one forward in seconds
    pub timeout_seconds: u64,

    /// Identifying user agent sent downstream
    pub user_agent: String,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        let defaults = ForwarderConfig::default();
        Self {
            timeout_seconds: defaults.timeout.as_secs(),
            user_agent: defaults.user_agent,
        }
    }
}

impl ForwardingConfig {
    /// Forwarder settings for the core crate
    pub fn to_forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Resolution cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Expiry of a cached resolution in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Routing table configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// YAML routing table loaded at start-up (optional)
    pub table_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
