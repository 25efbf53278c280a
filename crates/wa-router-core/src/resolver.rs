//! # Route Resolver
//!
//! Resolves a (vendor code, sender id) pair to a forwarding target.
//!
//! Lookup order:
//! 1. the resolution cache
//! 2. a specific routing rule for the sender
//! 3. the vendor's default environment
//!
//! Store hits are written back to the cache. "Not found" is never cached,
//! so a newly created default environment takes effect immediately. Cache
//! failures degrade to a store lookup and are only logged.

use crate::{
    cache::{CacheKey, CachedRoute, ResolutionCache},
    routing_log::{RoutingEvent, RoutingLogger},
    rule_store::{RuleStore, RuleStoreError},
    VendorCode,
};
use std::sync::Arc;

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Cache,
    Rule,
    DefaultEnvironment,
}

/// A resolved forwarding target and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub route: CachedRoute,
    pub source: RouteSource,
}

/// Result of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(ResolvedRoute),
    NotFound,
}

impl ResolutionOutcome {
    /// Get the resolved route, if any
    pub fn route(&self) -> Option<&CachedRoute> {
        match self {
            Self::Resolved(resolved) => Some(&resolved.route),
            Self::NotFound => None,
        }
    }
}

/// Cache-first resolver over a [`RuleStore`].
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn RuleStore>,
    cache: Arc<dyn ResolutionCache>,
    logger: Arc<dyn RoutingLogger>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn RuleStore>,
        cache: Arc<dyn ResolutionCache>,
        logger: Arc<dyn RoutingLogger>,
    ) -> Self {
        Self {
            store,
            cache,
            logger,
        }
    }

    /// Resolve the target for `sender_id` within the vendor.
    ///
    /// # Errors
    ///
    /// Returns the store error when a store lookup fails. Cache errors never
    /// surface here.
    pub async fn resolve(
        &self,
        vendor_code: &VendorCode,
        sender_id: &str,
    ) -> Result<ResolutionOutcome, RuleStoreError> {
        let key = CacheKey::new(vendor_code, sender_id);

        match self.cache.get(&key).await {
            Ok(Some(route)) => {
                self.logger.record(RoutingEvent::CacheHit {
                    cache_key: key.to_string(),
                    environment_code: route.environment_code.to_string(),
                    target_url: route.target_url.clone(),
                });
                return Ok(ResolutionOutcome::Resolved(ResolvedRoute {
                    route,
                    source: RouteSource::Cache,
                }));
            }
            Ok(None) => {}
            Err(e) => self.logger.record(RoutingEvent::CacheReadFailed {
                cache_key: key.to_string(),
                error: e.to_string(),
            }),
        }

        let resolved = match self.resolve_from_store(vendor_code, sender_id).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                self.logger.record(RoutingEvent::RouteNotFound {
                    vendor_code: vendor_code.to_string(),
                    sender_id: sender_id.to_string(),
                });
                return Ok(ResolutionOutcome::NotFound);
            }
            Err(e) => {
                self.logger.record(RoutingEvent::StoreLookupFailed {
                    vendor_code: vendor_code.to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        if let Err(e) = self.cache.set(key.clone(), resolved.route.clone()).await {
            self.logger.record(RoutingEvent::CacheWriteFailed {
                cache_key: key.to_string(),
                error: e.to_string(),
            });
        }

        Ok(ResolutionOutcome::Resolved(resolved))
    }

    async fn resolve_from_store(
        &self,
        vendor_code: &VendorCode,
        sender_id: &str,
    ) -> Result<Option<ResolvedRoute>, RuleStoreError> {
        if let Some(found) = self.store.find_rule(vendor_code, sender_id).await? {
            self.logger.record(RoutingEvent::RuleMatched {
                vendor_code: vendor_code.to_string(),
                sender_id: sender_id.to_string(),
                environment_code: found.environment.code.to_string(),
                target_url: found.environment.target_url.clone(),
            });
            return Ok(Some(ResolvedRoute {
                route: CachedRoute {
                    target_url: found.environment.target_url,
                    secret_bundle: found.vendor.secret_bundle.clone(),
                    environment_name: found.environment.name,
                    environment_code: found.environment.code,
                },
                source: RouteSource::Rule,
            }));
        }

        if let Some(found) = self.store.find_default_environment(vendor_code).await? {
            self.logger.record(RoutingEvent::DefaultEnvironmentUsed {
                vendor_code: vendor_code.to_string(),
                sender_id: sender_id.to_string(),
                environment_code: found.environment.code.to_string(),
                target_url: found.environment.target_url.clone(),
            });
            return Ok(Some(ResolvedRoute {
                route: CachedRoute {
                    target_url: found.environment.target_url,
                    secret_bundle: found.vendor.secret_bundle.clone(),
                    environment_name: found.environment.name,
                    environment_code: found.environment.code,
                },
                source: RouteSource::DefaultEnvironment,
            }));
        }

        Ok(None)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
