//! Construction of the routing stack from service configuration.

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wa_router_api::{ConfigError, ServiceConfig, ServiceError};
use wa_router_core::{
    CacheInvalidator, HttpForwarder, InMemoryResolutionCache, InMemoryRuleStore, ResolutionCache,
    Resolver, RoutingLogger, RoutingPipeline, RoutingTable, SecretInjector, TracingRoutingLogger,
};

/// Everything the HTTP server needs, plus the store for administration.
pub struct RoutingStack {
    pub pipeline: Arc<RoutingPipeline>,
    pub cache: Arc<dyn ResolutionCache>,
    pub store: Arc<InMemoryRuleStore>,
}

/// Wire cache, store, forwarder and pipeline.
///
/// The store notifies a [`CacheInvalidator`] on every routing change so
/// cached resolutions never outlive the rule they came from. When
/// `routing.table_path` is set the table is applied before the stack is
/// returned.
pub async fn build_routing_stack(config: &ServiceConfig) -> Result<RoutingStack, ServiceError> {
    let logger: Arc<dyn RoutingLogger> = Arc::new(TracingRoutingLogger::new());

    let memory_cache = Arc::new(InMemoryResolutionCache::new(config.cache.ttl()));
    spawn_cache_reaper(memory_cache.clone(), config.cache.ttl());
    let cache: Arc<dyn ResolutionCache> = memory_cache;
    let invalidator = Arc::new(CacheInvalidator::new(cache.clone(), logger.clone()));
    let store = Arc::new(InMemoryRuleStore::with_listener(invalidator));

    if let Some(path) = &config.routing.table_path {
        let table = RoutingTable::load(path).map_err(|e| {
            ServiceError::Configuration(ConfigError::Load {
                message: e.to_string(),
            })
        })?;
        let counts = table.apply(&store).await.map_err(|e| {
            ServiceError::Configuration(ConfigError::Load {
                message: e.to_string(),
            })
        })?;
        info!(
            path = %path.display(),
            vendors = counts.vendors,
            environments = counts.environments,
            rules = counts.rules,
            "Loaded routing table"
        );
    }

    let forwarder = HttpForwarder::new(config.forwarding.to_forwarder_config()).map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: e.to_string(),
        })
    })?;

    let resolver = Resolver::new(store.clone(), cache.clone(), logger.clone());
    let pipeline = RoutingPipeline::new(
        resolver,
        SecretInjector::new(&config.forwarding.user_agent),
        Arc::new(forwarder),
        logger,
    );

    Ok(RoutingStack {
        pipeline: Arc::new(pipeline),
        cache,
        store,
    })
}

/// Periodically drop expired resolutions so unseen senders do not pile up
pub fn spawn_cache_reaper(cache: Arc<InMemoryResolutionCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match cache.cleanup_expired() {
                Ok(removed) => debug!(removed, "Swept expired cache entries"),
                Err(e) => warn!(error = %e, "Failed to sweep expired cache entries"),
            }
        }
    })
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
