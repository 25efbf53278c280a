//! # Cache Invalidation
//!
//! [`RuleChangeListener`] that evicts resolution cache entries when routing
//! data changes. Stores call it before a write is committed.

use crate::{
    cache::{CacheKey, ResolutionCache},
    routing_log::{RoutingEvent, RoutingLogger},
    rule_store::RuleChangeListener,
    SenderId, VendorCode,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Evicts cache entries affected by rule store writes.
///
/// Eviction failures are logged and never block the write.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn ResolutionCache>,
    logger: Arc<dyn RoutingLogger>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn ResolutionCache>, logger: Arc<dyn RoutingLogger>) -> Self {
        Self { cache, logger }
    }

    async fn evict_key(&self, vendor_code: &VendorCode, sender_id: &SenderId) {
        let key = CacheKey::new(vendor_code, sender_id.as_str());
        match self.cache.delete(&key).await {
            Ok(was_present) => self.logger.record(RoutingEvent::CacheEntryEvicted {
                cache_key: key.to_string(),
                was_present,
            }),
            Err(e) => self.logger.record(RoutingEvent::CacheEvictionFailed {
                target: key.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RuleChangeListener for CacheInvalidator {
    async fn rule_removed(&self, vendor_code: &VendorCode, sender_id: &SenderId) {
        self.evict_key(vendor_code, sender_id).await;
    }

    async fn rule_bound(&self, vendor_code: &VendorCode, sender_id: &SenderId) {
        self.evict_key(vendor_code, sender_id).await;
    }

    async fn vendor_routes_changed(&self, vendor_code: &VendorCode) {
        match self.cache.delete_vendor(vendor_code).await {
            Ok(evicted) => self.logger.record(RoutingEvent::VendorCacheEvicted {
                vendor_code: vendor_code.to_string(),
                evicted,
            }),
            Err(e) => self.logger.record(RoutingEvent::CacheEvictionFailed {
                target: format!("vendor:{}", vendor_code),
                error: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "invalidation_tests.rs"]
mod tests;
