//! # Routing Data Model
//!
//! Vendor → Environment → RoutingRule records and the joined lookup results
//! handed to the resolver.
//!
//! Ownership is strictly hierarchical: a vendor owns its environments and an
//! environment owns its routing rules. Records refer to their parent by
//! store-assigned id; nothing is shared outside this tree.

use crate::{
    EnvironmentCode, EnvironmentId, RuleId, SenderId, Timestamp, ValidationError, VendorCode,
    VendorId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

// ============================================================================
// Secret Bundle
// ============================================================================

/// Vendor-level serialized JSON object of extra header key/value pairs.
///
/// The bundle is kept exactly as stored: it is not parsed until the moment a
/// request is forwarded, so a malformed bundle never prevents a vendor from
/// being saved or resolved. Contents are never included in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretBundle {
    raw: String,
}

impl SecretBundle {
    /// Wrap a serialized bundle
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Get the serialized bundle (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.raw
    }

    /// Check if the bundle is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Get bundle length without exposing content
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Check if the bundle holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SecretBundle {
    fn drop(&mut self) {
        self.raw.zeroize();
    }
}

// ============================================================================
// Records
// ============================================================================

/// External integration partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub code: VendorCode,
    pub secret_bundle: Option<SecretBundle>,
    pub updated_at: Timestamp,
}

/// Deployment target belonging to exactly one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub vendor_id: VendorId,
    pub name: String,
    pub code: EnvironmentCode,
    pub target_url: String,
    pub is_default: bool,
    pub updated_at: Timestamp,
}

/// Binds one sender identity to exactly one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: RuleId,
    pub environment_id: EnvironmentId,
    pub wa_id: SenderId,
    pub name: String,
    pub updated_at: Timestamp,
}

// ============================================================================
// Write Inputs
// ============================================================================

/// Fields of a vendor create or update.
#[derive(Debug, Clone)]
pub struct NewVendor {
    pub name: String,
    pub code: VendorCode,
    pub secret_bundle: Option<SecretBundle>,
}

impl NewVendor {
    /// Create vendor input without a secret bundle
    pub fn new(name: impl Into<String>, code: VendorCode) -> Self {
        Self {
            name: name.into(),
            code,
            secret_bundle: None,
        }
    }

    /// Attach a serialized secret bundle
    pub fn with_secret_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.secret_bundle = Some(SecretBundle::new(bundle));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_name("vendor.name", &self.name)
    }
}

/// Fields of an environment create or update.
#[derive(Debug, Clone)]
pub struct NewEnvironment {
    pub vendor_id: VendorId,
    pub name: String,
    pub code: EnvironmentCode,
    pub target_url: String,
    pub is_default: bool,
}

impl NewEnvironment {
    /// Create a non-default environment input
    pub fn new(
        vendor_id: VendorId,
        name: impl Into<String>,
        code: EnvironmentCode,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            vendor_id,
            name: name.into(),
            code,
            target_url: target_url.into(),
            is_default: false,
        }
    }

    /// Mark the environment as the vendor's default
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_name("environment.name", &self.name)?;
        validate_target_url(&self.target_url)
    }
}

/// Fields of a routing rule create or update.
#[derive(Debug, Clone)]
pub struct NewRoutingRule {
    pub environment_id: EnvironmentId,
    pub wa_id: SenderId,
    pub name: String,
}

impl NewRoutingRule {
    /// Create routing rule input
    pub fn new(environment_id: EnvironmentId, wa_id: SenderId, name: impl Into<String>) -> Self {
        Self {
            environment_id,
            wa_id,
            name: name.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_name("rule.name", &self.name)
    }
}

const MAX_NAME_LENGTH: usize = 100;
const MAX_TARGET_URL_LENGTH: usize = 512;

fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Check that a forwarding destination is an absolute http(s) URL.
pub fn validate_target_url(target_url: &str) -> Result<(), ValidationError> {
    if target_url.len() > MAX_TARGET_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "target_url".to_string(),
            max_length: MAX_TARGET_URL_LENGTH,
        });
    }

    let parsed = url::Url::parse(target_url).map_err(|e| ValidationError::InvalidFormat {
        field: "target_url".to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        "http" | "https" => Err(ValidationError::InvalidFormat {
            field: "target_url".to_string(),
            message: "missing host".to_string(),
        }),
        other => Err(ValidationError::InvalidFormat {
            field: "target_url".to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

// ============================================================================
// Joined Lookup Results
// ============================================================================

/// A routing rule joined to its environment and vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: RoutingRule,
    pub environment: Environment,
    pub vendor: Vendor,
}

/// An environment joined to its vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentMatch {
    pub environment: Environment,
    pub vendor: Vendor,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
