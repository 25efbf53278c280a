//! # Routing Table
//!
//! YAML description of vendors, environments and routing rules used to seed
//! a rule store at start-up.
//!
//! ```yaml
//! vendors:
//!   - name: Acme
//!     code: acme
//!     secret_bundle: '{"X-Api-Key":"abc"}'
//!     environments:
//!       - name: Production
//!         code: prod
//!         target_url: https://prod.acme.example/webhook
//!         is_default: true
//!       - name: Development
//!         code: dev
//!         target_url: https://dev.acme.example/webhook
//!         rules:
//!           - wa_id: "15551234567"
//!             name: QA phone
//! ```
//!
//! Applying a table goes through the store's normal write operations, so
//! every data-model invariant is enforced on load.

use crate::{
    adapters::InMemoryRuleStore,
    model::{NewEnvironment, NewRoutingRule, NewVendor},
    rule_store::RuleStoreError,
    EnvironmentCode, SenderId, VendorCode,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parsed routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    #[serde(default)]
    pub vendors: Vec<VendorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorEntry {
    pub name: String,
    pub code: VendorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_bundle: Option<String>,
    #[serde(default)]
    pub environments: Vec<EnvironmentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub code: EnvironmentCode,
    pub target_url: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub wa_id: SenderId,
    pub name: String,
}

/// Number of records created by [`RoutingTable::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedCounts {
    pub vendors: usize,
    pub environments: usize,
    pub rules: usize,
}

/// Errors loading or applying a routing table.
#[derive(Debug, thiserror::Error)]
pub enum RoutingTableError {
    #[error("Failed to read routing table '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse routing table: {message}")]
    Parse { message: String },

    #[error("Routing table rejected by the rule store: {0}")]
    Store(#[from] RuleStoreError),
}

impl RoutingTable {
    /// Read and parse a table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoutingTableError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| RoutingTableError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a table from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self, RoutingTableError> {
        serde_yaml::from_str(contents).map_err(|e| RoutingTableError::Parse {
            message: e.to_string(),
        })
    }

    /// Create every record of the table in `store`.
    ///
    /// Stops at the first rejected write; records created before it remain.
    pub async fn apply(&self, store: &InMemoryRuleStore) -> Result<AppliedCounts, RoutingTableError> {
        let mut counts = AppliedCounts::default();

        for vendor_entry in &self.vendors {
            let mut input = NewVendor::new(vendor_entry.name.clone(), vendor_entry.code.clone());
            if let Some(bundle) = &vendor_entry.secret_bundle {
                input = input.with_secret_bundle(bundle.clone());
            }
            let vendor = store.create_vendor(input).await?;
            counts.vendors += 1;

            for env_entry in &vendor_entry.environments {
                let mut input = NewEnvironment::new(
                    vendor.id,
                    env_entry.name.clone(),
                    env_entry.code.clone(),
                    env_entry.target_url.clone(),
                );
                if env_entry.is_default {
                    input = input.as_default();
                }
                let environment = store.create_environment(input).await?;
                counts.environments += 1;

                for rule_entry in &env_entry.rules {
                    store
                        .create_rule(NewRoutingRule::new(
                            environment.id,
                            rule_entry.wa_id.clone(),
                            rule_entry.name.clone(),
                        ))
                        .await?;
                    counts.rules += 1;
                }
            }
        }

        Ok(counts)
    }
}

#[cfg(test)]
#[path = "routing_table_tests.rs"]
mod tests;
