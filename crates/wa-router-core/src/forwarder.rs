//! # Forwarder
//!
//! Single-attempt outbound HTTP POST of the original payload to a resolved
//! target.
//!
//! A forward either completes with a non-error response, which is passed
//! back verbatim, or fails with a [`ForwardError`]. Nothing is retried.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::time::Duration;

use crate::secrets::DEFAULT_USER_AGENT;

/// Default bound on one forward, connect through body.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Request / Response
// ============================================================================

/// One outbound forward.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub target_url: String,
    pub body: Bytes,
    pub headers: HeaderMap,
}

/// Downstream response passed back to the inbound caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for [`HttpForwarder`]
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Bound on the whole request
    pub timeout: Duration,

    /// User agent sent when the request carries none
    pub user_agent: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FORWARD_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// ============================================================================
// Interface
// ============================================================================

/// Delivers a payload to a downstream environment.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Issue exactly one POST.
    ///
    /// # Errors
    ///
    /// Fails on network errors, timeouts and any 4xx/5xx response.
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardedResponse, ForwardError>;
}

/// Forward failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("Forward timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Downstream returned error status {status}")]
    Status { status: u16 },

    #[error("Invalid target URL '{target_url}': {message}")]
    InvalidTarget { target_url: String, message: String },

    #[error("Forwarder configuration error: {message}")]
    Configuration { message: String },
}

impl ForwardError {
    /// Check if the downstream was reached and answered
    pub fn is_downstream_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// [`Forwarder`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    config: ForwarderConfig,
}

impl HttpForwarder {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `ForwardError::Configuration` if the HTTP client cannot be
    /// created.
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ForwardError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn classify(&self, target_url: &str, error: reqwest::Error) -> ForwardError {
        if error.is_timeout() {
            ForwardError::Timeout {
                timeout: self.config.timeout,
            }
        } else if error.is_builder() {
            ForwardError::InvalidTarget {
                target_url: target_url.to_string(),
                message: error.to_string(),
            }
        } else {
            ForwardError::Network {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardedResponse, ForwardError> {
        let url = reqwest::Url::parse(&request.target_url).map_err(|e| {
            ForwardError::InvalidTarget {
                target_url: request.target_url.clone(),
                message: e.to_string(),
            }
        })?;

        let response = self
            .client
            .post(url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| self.classify(&request.target_url, e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ForwardError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(&request.target_url, e))?;

        Ok(ForwardedResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;
