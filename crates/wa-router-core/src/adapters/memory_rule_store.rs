//! # In-Memory Rule Store
//!
//! Arena-style implementation of [`RuleStore`] together with the write
//! surface an administrative front end would use.
//!
//! Every write enforces the data-model invariants before anything is
//! committed:
//! - vendor codes are globally unique
//! - environment codes are unique within their vendor
//! - a vendor has at most one default environment
//! - a sender id is bound at most once per vendor, across all of its
//!   environments
//!
//! Deletes cascade explicitly (vendor → environments → rules). The
//! registered [`RuleChangeListener`] is awaited for every affected rule
//! while the write lock is held, so eviction always happens before the
//! delete becomes visible. Listeners must not call back into the store.

use crate::model::{
    Environment, EnvironmentMatch, NewEnvironment, NewRoutingRule, NewVendor, RoutingRule,
    RuleMatch, Vendor,
};
use crate::rule_store::{RuleChangeListener, RuleStore, RuleStoreError};
use crate::{
    EnvironmentId, RuleId, SenderId, Timestamp, ValidationError, VendorCode, VendorId,
};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    vendors: BTreeMap<VendorId, Vendor>,
    environments: BTreeMap<EnvironmentId, Environment>,
    rules: BTreeMap<RuleId, RoutingRule>,
}

impl StoreState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn vendor_by_code(&self, code: &VendorCode) -> Option<&Vendor> {
        self.vendors.values().find(|v| &v.code == code)
    }

    fn vendor(&self, id: VendorId) -> Result<&Vendor, RuleStoreError> {
        self.vendors.get(&id).ok_or(RuleStoreError::VendorNotFound(id))
    }

    fn environment(&self, id: EnvironmentId) -> Result<&Environment, RuleStoreError> {
        self.environments
            .get(&id)
            .ok_or(RuleStoreError::EnvironmentNotFound(id))
    }

    fn environments_of(&self, vendor_id: VendorId) -> impl Iterator<Item = &Environment> {
        self.environments
            .values()
            .filter(move |e| e.vendor_id == vendor_id)
    }

    fn rules_of(&self, environment_id: EnvironmentId) -> impl Iterator<Item = &RoutingRule> {
        self.rules
            .values()
            .filter(move |r| r.environment_id == environment_id)
    }

    fn rules_of_vendor(&self, vendor_id: VendorId) -> Vec<&RoutingRule> {
        self.environments_of(vendor_id)
            .flat_map(|e| self.rules_of(e.id))
            .collect()
    }

    fn ensure_vendor_code_free(
        &self,
        code: &VendorCode,
        exclude: Option<VendorId>,
    ) -> Result<(), RuleStoreError> {
        let taken = self
            .vendors
            .values()
            .any(|v| &v.code == code && Some(v.id) != exclude);

        if taken {
            return Err(RuleStoreError::DuplicateCode {
                code: code.to_string(),
                scope: "vendors".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_environment_valid(
        &self,
        input: &NewEnvironment,
        exclude: Option<EnvironmentId>,
    ) -> Result<(), RuleStoreError> {
        input.validate()?;
        let vendor = self.vendor(input.vendor_id)?;

        let code_taken = self
            .environments_of(vendor.id)
            .any(|e| e.code == input.code && Some(e.id) != exclude);
        if code_taken {
            return Err(RuleStoreError::DuplicateCode {
                code: input.code.to_string(),
                scope: format!("environments of vendor '{}'", vendor.code),
            });
        }

        if input.is_default {
            let default_taken = self
                .environments_of(vendor.id)
                .any(|e| e.is_default && Some(e.id) != exclude);
            if default_taken {
                return Err(RuleStoreError::DuplicateDefault {
                    vendor_code: vendor.code.clone(),
                });
            }
        }

        Ok(())
    }

    /// Returns the code of the vendor the rule would belong to.
    fn ensure_rule_valid(
        &self,
        input: &NewRoutingRule,
        exclude: Option<RuleId>,
    ) -> Result<VendorCode, RuleStoreError> {
        input.validate()?;
        let environment = self.environment(input.environment_id)?;
        let vendor = self.vendor(environment.vendor_id)?;

        let conflict = self
            .rules_of_vendor(vendor.id)
            .into_iter()
            .any(|r| r.wa_id == input.wa_id && Some(r.id) != exclude);
        if conflict {
            return Err(RuleStoreError::DuplicateSenderBinding {
                vendor_code: vendor.code.clone(),
                wa_id: input.wa_id.clone(),
            });
        }

        Ok(vendor.code.clone())
    }

    fn rule_binding(&self, rule: &RoutingRule) -> Result<(VendorCode, SenderId), RuleStoreError> {
        let environment = self.environment(rule.environment_id)?;
        let vendor = self.vendor(environment.vendor_id)?;
        Ok((vendor.code.clone(), rule.wa_id.clone()))
    }
}

/// Thread-safe in-memory rule store
///
/// Clones share the same records and listener.
#[derive(Clone, Default)]
pub struct InMemoryRuleStore {
    state: Arc<RwLock<StoreState>>,
    listener: Option<Arc<dyn RuleChangeListener>>,
}

impl InMemoryRuleStore {
    /// Create new empty store without a change listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new empty store notifying `listener` of routing changes
    pub fn with_listener(listener: Arc<dyn RuleChangeListener>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            listener: Some(listener),
        }
    }

    async fn notify_rule_removed(&self, vendor_code: &VendorCode, sender_id: &SenderId) {
        if let Some(listener) = &self.listener {
            listener.rule_removed(vendor_code, sender_id).await;
        }
    }

    async fn notify_rule_bound(&self, vendor_code: &VendorCode, sender_id: &SenderId) {
        if let Some(listener) = &self.listener {
            listener.rule_bound(vendor_code, sender_id).await;
        }
    }

    async fn notify_vendor_changed(&self, vendor_code: &VendorCode) {
        if let Some(listener) = &self.listener {
            listener.vendor_routes_changed(vendor_code).await;
        }
    }

    // ------------------------------------------------------------------------
    // Vendors
    // ------------------------------------------------------------------------

    /// Create a vendor
    pub async fn create_vendor(&self, input: NewVendor) -> Result<Vendor, RuleStoreError> {
        let mut state = self.state.write().await;
        input.validate()?;
        state.ensure_vendor_code_free(&input.code, None)?;

        let vendor = Vendor {
            id: VendorId::new(state.allocate_id()),
            name: input.name,
            code: input.code,
            secret_bundle: input.secret_bundle,
            updated_at: Timestamp::now(),
        };
        state.vendors.insert(vendor.id, vendor.clone());
        Ok(vendor)
    }

    /// Replace a vendor's name, code and secret bundle
    pub async fn update_vendor(
        &self,
        id: VendorId,
        input: NewVendor,
    ) -> Result<Vendor, RuleStoreError> {
        let mut state = self.state.write().await;
        input.validate()?;
        let previous_code = state.vendor(id)?.code.clone();
        state.ensure_vendor_code_free(&input.code, Some(id))?;

        self.notify_vendor_changed(&previous_code).await;
        if previous_code != input.code {
            self.notify_vendor_changed(&input.code).await;
        }

        let vendor = Vendor {
            id,
            name: input.name,
            code: input.code,
            secret_bundle: input.secret_bundle,
            updated_at: Timestamp::now(),
        };
        state.vendors.insert(id, vendor.clone());
        Ok(vendor)
    }

    /// Delete a vendor with all of its environments and rules
    pub async fn delete_vendor(&self, id: VendorId) -> Result<(), RuleStoreError> {
        let mut state = self.state.write().await;
        let vendor_code = state.vendor(id)?.code.clone();

        let environment_ids: Vec<EnvironmentId> =
            state.environments_of(id).map(|e| e.id).collect();
        let rules: Vec<(RuleId, SenderId)> = state
            .rules_of_vendor(id)
            .into_iter()
            .map(|r| (r.id, r.wa_id.clone()))
            .collect();

        for (_, wa_id) in &rules {
            self.notify_rule_removed(&vendor_code, wa_id).await;
        }
        self.notify_vendor_changed(&vendor_code).await;

        for (rule_id, _) in rules {
            state.rules.remove(&rule_id);
        }
        for environment_id in environment_ids {
            state.environments.remove(&environment_id);
        }
        state.vendors.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------------

    /// Create an environment
    pub async fn create_environment(
        &self,
        input: NewEnvironment,
    ) -> Result<Environment, RuleStoreError> {
        let mut state = self.state.write().await;
        state.ensure_environment_valid(&input, None)?;

        let environment = Environment {
            id: EnvironmentId::new(state.allocate_id()),
            vendor_id: input.vendor_id,
            name: input.name,
            code: input.code,
            target_url: input.target_url,
            is_default: input.is_default,
            updated_at: Timestamp::now(),
        };
        state
            .environments
            .insert(environment.id, environment.clone());
        Ok(environment)
    }

    /// Replace an environment's name, code, target and default flag
    ///
    /// Environments cannot move between vendors.
    pub async fn update_environment(
        &self,
        id: EnvironmentId,
        input: NewEnvironment,
    ) -> Result<Environment, RuleStoreError> {
        let mut state = self.state.write().await;
        let current_vendor = state.environment(id)?.vendor_id;
        if current_vendor != input.vendor_id {
            return Err(ValidationError::InvalidFormat {
                field: "vendor_id".to_string(),
                message: "environments cannot move between vendors".to_string(),
            }
            .into());
        }
        state.ensure_environment_valid(&input, Some(id))?;

        let vendor_code = state.vendor(input.vendor_id)?.code.clone();
        self.notify_vendor_changed(&vendor_code).await;

        let environment = Environment {
            id,
            vendor_id: input.vendor_id,
            name: input.name,
            code: input.code,
            target_url: input.target_url,
            is_default: input.is_default,
            updated_at: Timestamp::now(),
        };
        state.environments.insert(id, environment.clone());
        Ok(environment)
    }

    /// Delete an environment with all of its rules
    pub async fn delete_environment(&self, id: EnvironmentId) -> Result<(), RuleStoreError> {
        let mut state = self.state.write().await;
        let vendor_id = state.environment(id)?.vendor_id;
        let vendor_code = state.vendor(vendor_id)?.code.clone();

        let rules: Vec<(RuleId, SenderId)> = state
            .rules_of(id)
            .map(|r| (r.id, r.wa_id.clone()))
            .collect();

        for (_, wa_id) in &rules {
            self.notify_rule_removed(&vendor_code, wa_id).await;
        }
        self.notify_vendor_changed(&vendor_code).await;

        for (rule_id, _) in rules {
            state.rules.remove(&rule_id);
        }
        state.environments.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Routing rules
    // ------------------------------------------------------------------------

    /// Create a routing rule
    pub async fn create_rule(&self, input: NewRoutingRule) -> Result<RoutingRule, RuleStoreError> {
        let mut state = self.state.write().await;
        let vendor_code = state.ensure_rule_valid(&input, None)?;

        self.notify_rule_bound(&vendor_code, &input.wa_id).await;

        let rule = RoutingRule {
            id: RuleId::new(state.allocate_id()),
            environment_id: input.environment_id,
            wa_id: input.wa_id,
            name: input.name,
            updated_at: Timestamp::now(),
        };
        state.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    /// Replace a routing rule's environment, sender id and name
    pub async fn update_rule(
        &self,
        id: RuleId,
        input: NewRoutingRule,
    ) -> Result<RoutingRule, RuleStoreError> {
        let mut state = self.state.write().await;
        let existing = state
            .rules
            .get(&id)
            .ok_or(RuleStoreError::RuleNotFound(id))?
            .clone();
        let vendor_code = state.ensure_rule_valid(&input, Some(id))?;
        let (previous_vendor, previous_wa_id) = state.rule_binding(&existing)?;

        self.notify_rule_removed(&previous_vendor, &previous_wa_id)
            .await;
        if previous_vendor != vendor_code || previous_wa_id != input.wa_id {
            self.notify_rule_bound(&vendor_code, &input.wa_id).await;
        }

        let rule = RoutingRule {
            id,
            environment_id: input.environment_id,
            wa_id: input.wa_id,
            name: input.name,
            updated_at: Timestamp::now(),
        };
        state.rules.insert(id, rule.clone());
        Ok(rule)
    }

    /// Delete a routing rule, evicting its cached resolution first
    pub async fn delete_rule(&self, id: RuleId) -> Result<(), RuleStoreError> {
        let mut state = self.state.write().await;
        let rule = state
            .rules
            .get(&id)
            .ok_or(RuleStoreError::RuleNotFound(id))?;
        let (vendor_code, wa_id) = state.rule_binding(rule)?;

        self.notify_rule_removed(&vendor_code, &wa_id).await;

        state.rules.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Get a vendor by id
    pub async fn get_vendor(&self, id: VendorId) -> Option<Vendor> {
        self.state.read().await.vendors.get(&id).cloned()
    }

    /// Get a vendor by code
    pub async fn get_vendor_by_code(&self, code: &VendorCode) -> Option<Vendor> {
        self.state.read().await.vendor_by_code(code).cloned()
    }

    /// Get an environment by id
    pub async fn get_environment(&self, id: EnvironmentId) -> Option<Environment> {
        self.state.read().await.environments.get(&id).cloned()
    }

    /// Get a routing rule by id
    pub async fn get_rule(&self, id: RuleId) -> Option<RoutingRule> {
        self.state.read().await.rules.get(&id).cloned()
    }

    /// List environments of a vendor
    pub async fn list_environments(&self, vendor_id: VendorId) -> Vec<Environment> {
        self.state
            .read()
            .await
            .environments_of(vendor_id)
            .cloned()
            .collect()
    }

    /// List rules of an environment
    pub async fn list_rules(&self, environment_id: EnvironmentId) -> Vec<RoutingRule> {
        self.state
            .read()
            .await
            .rules_of(environment_id)
            .cloned()
            .collect()
    }

    /// Total number of (vendors, environments, rules)
    pub async fn counts(&self) -> (usize, usize, usize) {
        let state = self.state.read().await;
        (
            state.vendors.len(),
            state.environments.len(),
            state.rules.len(),
        )
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_rule(
        &self,
        vendor_code: &VendorCode,
        sender_id: &str,
    ) -> Result<Option<RuleMatch>, RuleStoreError> {
        let state = self.state.read().await;
        let Some(vendor) = state.vendor_by_code(vendor_code) else {
            return Ok(None);
        };

        let found = state
            .rules_of_vendor(vendor.id)
            .into_iter()
            .find(|r| r.wa_id.as_str() == sender_id);

        match found {
            Some(rule) => {
                let environment = state.environment(rule.environment_id)?;
                Ok(Some(RuleMatch {
                    rule: rule.clone(),
                    environment: environment.clone(),
                    vendor: vendor.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn find_default_environment(
        &self,
        vendor_code: &VendorCode,
    ) -> Result<Option<EnvironmentMatch>, RuleStoreError> {
        let state = self.state.read().await;
        let Some(vendor) = state.vendor_by_code(vendor_code) else {
            return Ok(None);
        };

        let found = state
            .environments_of(vendor.id)
            .find(|e| e.is_default)
            .map(|environment| EnvironmentMatch {
                environment: environment.clone(),
                vendor: vendor.clone(),
            });
        Ok(found)
    }
}

#[cfg(test)]
#[path = "memory_rule_store_tests.rs"]
mod tests;
