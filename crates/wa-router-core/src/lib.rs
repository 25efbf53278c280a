//! # WA-Router Core
//!
//! Core business logic for the WA-Router webhook routing service.
//!
//! This crate resolves inbound vendor webhooks to a downstream environment,
//! injects the vendor's secret headers and forwards the original payload.
//!
//! ## Architecture
//!
//! The core follows the same layering as the rest of the workspace:
//! - Business logic depends only on trait abstractions ([`RuleStore`],
//!   [`ResolutionCache`], [`Forwarder`], [`RoutingLogger`])
//! - Infrastructure implementations are injected at runtime
//! - In-memory adapters live in [`adapters`]
//!
//! ## Usage
//!
//! ```rust
//! use wa_router_core::{CacheKey, VendorCode};
//!
//! let vendor = VendorCode::new("acme").unwrap();
//! let key = CacheKey::new(&vendor, "15551234567");
//! assert_eq!(key.to_string(), "rule:acme:15551234567");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Maximum length of vendor and environment codes.
pub const MAX_CODE_LENGTH: usize = 50;

/// Maximum length of a sender id stored on a routing rule.
pub const MAX_SENDER_ID_LENGTH: usize = 20;

fn validate_slug(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_CODE_LENGTH,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            invalid_chars: "non-alphanumeric except hyphens and underscores".to_string(),
        });
    }

    Ok(())
}

/// Stable, URL-safe identifier of a vendor.
///
/// Vendor codes appear verbatim as the last path segment of the inbound
/// webhook URL (`/webhook/meta/{vendor_code}`) and as part of every cache key.
///
/// # Validation Rules
/// - Must be 1-50 characters
/// - Must contain only ASCII letters, digits, hyphens and underscores
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VendorCode(String);

impl VendorCode {
    /// Create new vendor code with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_slug("vendor_code", &value)?;
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VendorCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VendorCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VendorCode> for String {
    fn from(value: VendorCode) -> Self {
        value.0
    }
}

/// Identifier of an environment, unique within its vendor (e.g. `prod`, `dev`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentCode(String);

impl EnvironmentCode {
    /// Create new environment code with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_slug("environment_code", &value)?;
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EnvironmentCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EnvironmentCode> for String {
    fn from(value: EnvironmentCode) -> Self {
        value.0
    }
}

/// Sender identity (`wa_id`) bound by a routing rule.
///
/// This is the phone-number-shaped string WhatsApp reports in the `from`
/// field of an inbound message.
///
/// # Validation Rules
/// - Must be 1-20 characters
/// - Must not contain whitespace or control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SenderId(String);

impl SenderId {
    /// Create new sender id with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "wa_id".to_string(),
            });
        }

        if value.chars().count() > MAX_SENDER_ID_LENGTH {
            return Err(ValidationError::TooLong {
                field: "wa_id".to_string(),
                max_length: MAX_SENDER_ID_LENGTH,
            });
        }

        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidCharacters {
                field: "wa_id".to_string(),
                invalid_chars: "whitespace or control characters".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SenderId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SenderId> for String {
    fn from(value: SenderId) -> Self {
        value.0
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Create identifier from its numeric value
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get numeric value
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Store-assigned identifier of a vendor record
    VendorId
);
record_id!(
    /// Store-assigned identifier of an environment record
    EnvironmentId
);
record_id!(
    /// Store-assigned identifier of a routing rule record
    RuleId
);

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Add a duration to the timestamp, saturating on overflow
    pub fn add_duration(&self, duration: Duration) -> Self {
        let chrono_duration = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        Self(
            self.0
                .checked_add_signed(chrono_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Get duration since another timestamp
    pub fn duration_since(&self, other: Self) -> Duration {
        let chrono_duration = self.0.signed_duration_since(other.0);
        chrono_duration.to_std().unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Vendor, environment and routing rule records
pub mod model;

/// Sender id extraction from inbound webhook payloads
pub mod extraction;

/// Rule store interface and change notifications
pub mod rule_store;

/// Resolution cache interface
pub mod cache;

/// Resolution of (vendor, sender) pairs to a target
pub mod resolver;

/// Secret bundle header injection
pub mod secrets;

/// Outbound HTTP forwarding
pub mod forwarder;

/// Cache eviction on routing changes
pub mod invalidation;

/// End-to-end extract, resolve, inject and forward pipeline
pub mod pipeline;

/// Injected routing log capability
pub mod routing_log;

/// YAML routing table loading
pub mod routing_table;

/// In-memory infrastructure implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{InMemoryResolutionCache, InMemoryRuleStore};
pub use cache::{CacheError, CacheKey, CacheStatistics, CachedRoute, ResolutionCache};
pub use extraction::extract_sender_id;
pub use forwarder::{
    ForwardError, ForwardRequest, ForwardedResponse, Forwarder, ForwarderConfig, HttpForwarder,
};
pub use invalidation::CacheInvalidator;
pub use model::{
    Environment, EnvironmentMatch, NewEnvironment, NewRoutingRule, NewVendor, RoutingRule,
    RuleMatch, SecretBundle, Vendor,
};
pub use pipeline::{RoutingFailure, RoutingPipeline};
pub use resolver::{ResolutionOutcome, ResolvedRoute, Resolver, RouteSource};
pub use routing_log::{
    MemoryRoutingLogger, RoutingEvent, RoutingEventLevel, RoutingLogger, TracingRoutingLogger,
};
pub use routing_table::{AppliedCounts, RoutingTable, RoutingTableError};
pub use rule_store::{RuleChangeListener, RuleStore, RuleStoreError};
pub use secrets::{InjectedHeaders, SecretBundleError, SecretInjector};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
