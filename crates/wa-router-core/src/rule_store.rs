//! # Rule Store Module
//!
//! Read interface the resolver consumes, the error taxonomy shared by all
//! store implementations, and the change notifications a store raises when
//! routing data is removed or edited.

use crate::{
    model::{EnvironmentMatch, RuleMatch},
    EnvironmentId, RuleId, SenderId, ValidationError, VendorCode, VendorId,
};
use async_trait::async_trait;

// ============================================================================
// Interface Traits
// ============================================================================

/// Point lookups over the Vendor → Environment → RoutingRule relation.
///
/// Implementations must support concurrent reads.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Find the routing rule binding `sender_id` within the vendor.
    ///
    /// Returns at most one rule, joined to its environment and vendor.
    async fn find_rule(
        &self,
        vendor_code: &VendorCode,
        sender_id: &str,
    ) -> Result<Option<RuleMatch>, RuleStoreError>;

    /// Find the vendor's default environment.
    ///
    /// Returns at most one environment, joined to its vendor.
    async fn find_default_environment(
        &self,
        vendor_code: &VendorCode,
    ) -> Result<Option<EnvironmentMatch>, RuleStoreError>;
}

/// Observer of routing data changes.
///
/// Stores call the listener synchronously, before the corresponding write
/// completes, for every rule that disappears (directly or through a cascade)
/// and for every vendor whose resolutions may have changed.
#[async_trait]
pub trait RuleChangeListener: Send + Sync {
    /// A binding of `sender_id` within the vendor is about to be removed.
    async fn rule_removed(&self, vendor_code: &VendorCode, sender_id: &SenderId);

    /// `sender_id` is about to gain a specific binding within the vendor.
    ///
    /// A resolution cached through the default environment would otherwise
    /// shadow the new rule until it expired.
    async fn rule_bound(&self, vendor_code: &VendorCode, sender_id: &SenderId);

    /// Environment targets, the default flag or the secret bundle of the
    /// vendor changed, so any resolution for the vendor may be stale.
    async fn vendor_routes_changed(&self, vendor_code: &VendorCode);
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by rule store reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleStoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Vendor '{vendor_code}' already has a default environment")]
    DuplicateDefault { vendor_code: VendorCode },

    #[error("The WhatsApp ID '{wa_id}' is already assigned to an environment for vendor '{vendor_code}'")]
    DuplicateSenderBinding {
        vendor_code: VendorCode,
        wa_id: SenderId,
    },

    #[error("Code '{code}' is already in use ({scope})")]
    DuplicateCode { code: String, scope: String },

    #[error("Vendor {0} not found")]
    VendorNotFound(VendorId),

    #[error("Environment {0} not found")]
    EnvironmentNotFound(EnvironmentId),

    #[error("Routing rule {0} not found")]
    RuleNotFound(RuleId),

    #[error("Rule store unavailable: {message}")]
    Unavailable { message: String },
}

impl RuleStoreError {
    /// Check if the error rejects a write that violates a data-model invariant
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateDefault { .. }
                | Self::DuplicateSenderBinding { .. }
                | Self::DuplicateCode { .. }
        )
    }
}
