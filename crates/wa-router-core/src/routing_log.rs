//! # Routing Log
//!
//! Operational log capability injected into the resolver, the pipeline and
//! the invalidation listener.
//!
//! Components describe what happened as a [`RoutingEvent`]; the logger
//! decides where it goes. [`TracingRoutingLogger`] emits structured
//! `tracing` events, [`MemoryRoutingLogger`] keeps them for inspection.

use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Severity of a routing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoutingEventLevel {
    Info,
    Warn,
    Error,
}

/// Something worth recording about a webhook's trip through the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEvent {
    SenderExtracted {
        vendor_code: String,
        sender_id: String,
    },
    SenderMissing {
        vendor_code: String,
    },
    CacheHit {
        cache_key: String,
        environment_code: String,
        target_url: String,
    },
    RuleMatched {
        vendor_code: String,
        sender_id: String,
        environment_code: String,
        target_url: String,
    },
    DefaultEnvironmentUsed {
        vendor_code: String,
        sender_id: String,
        environment_code: String,
        target_url: String,
    },
    RouteNotFound {
        vendor_code: String,
        sender_id: String,
    },
    StoreLookupFailed {
        vendor_code: String,
        error: String,
    },
    CacheReadFailed {
        cache_key: String,
        error: String,
    },
    CacheWriteFailed {
        cache_key: String,
        error: String,
    },
    CacheEntryEvicted {
        cache_key: String,
        was_present: bool,
    },
    VendorCacheEvicted {
        vendor_code: String,
        evicted: usize,
    },
    CacheEvictionFailed {
        target: String,
        error: String,
    },
    SecretBundleRejected {
        vendor_code: String,
        error: String,
    },
    SecretHeaderSkipped {
        vendor_code: String,
        header: String,
    },
    ForwardSucceeded {
        vendor_code: String,
        sender_id: String,
        target_url: String,
        status: u16,
    },
    ForwardFailed {
        vendor_code: String,
        target_url: String,
        error: String,
    },
}

impl RoutingEvent {
    /// Severity the event is recorded at
    pub fn level(&self) -> RoutingEventLevel {
        match self {
            Self::SenderExtracted { .. }
            | Self::CacheHit { .. }
            | Self::RuleMatched { .. }
            | Self::DefaultEnvironmentUsed { .. }
            | Self::CacheEntryEvicted { .. }
            | Self::VendorCacheEvicted { .. }
            | Self::ForwardSucceeded { .. } => RoutingEventLevel::Info,
            Self::SenderMissing { .. }
            | Self::CacheReadFailed { .. }
            | Self::CacheWriteFailed { .. }
            | Self::CacheEvictionFailed { .. }
            | Self::SecretHeaderSkipped { .. } => RoutingEventLevel::Warn,
            Self::RouteNotFound { .. }
            | Self::StoreLookupFailed { .. }
            | Self::SecretBundleRejected { .. }
            | Self::ForwardFailed { .. } => RoutingEventLevel::Error,
        }
    }
}

/// Injected logging capability.
pub trait RoutingLogger: Send + Sync {
    /// Record one event
    fn record(&self, event: RoutingEvent);
}

// ============================================================================
// Tracing Logger
// ============================================================================

/// Production logger forwarding every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRoutingLogger;

impl TracingRoutingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingLogger for TracingRoutingLogger {
    fn record(&self, event: RoutingEvent) {
        match event {
            RoutingEvent::SenderExtracted {
                vendor_code,
                sender_id,
            } => info!(vendor = %vendor_code, wa_id = %sender_id, "Extracted sender id from payload"),
            RoutingEvent::SenderMissing { vendor_code } => warn!(
                vendor = %vendor_code,
                "Could not extract wa_id from payload"
            ),
            RoutingEvent::CacheHit {
                cache_key,
                environment_code,
                target_url,
            } => info!(
                cache_key = %cache_key,
                environment = %environment_code,
                target_url = %target_url,
                "Cache hit, using cached routing rule"
            ),
            RoutingEvent::RuleMatched {
                vendor_code,
                sender_id,
                environment_code,
                target_url,
            } => info!(
                vendor = %vendor_code,
                wa_id = %sender_id,
                environment = %environment_code,
                target_url = %target_url,
                "Found specific routing rule"
            ),
            RoutingEvent::DefaultEnvironmentUsed {
                vendor_code,
                sender_id,
                environment_code,
                target_url,
            } => info!(
                vendor = %vendor_code,
                wa_id = %sender_id,
                environment = %environment_code,
                target_url = %target_url,
                "Using default environment"
            ),
            RoutingEvent::RouteNotFound {
                vendor_code,
                sender_id,
            } => error!(
                vendor = %vendor_code,
                wa_id = %sender_id,
                "Routing failed, no rule or default environment found"
            ),
            RoutingEvent::StoreLookupFailed { vendor_code, error } => error!(
                vendor = %vendor_code,
                error = %error,
                "Rule store lookup failed"
            ),
            RoutingEvent::CacheReadFailed { cache_key, error } => warn!(
                cache_key = %cache_key,
                error = %error,
                "Cache read failed, falling back to rule store"
            ),
            RoutingEvent::CacheWriteFailed { cache_key, error } => warn!(
                cache_key = %cache_key,
                error = %error,
                "Cache write failed"
            ),
            RoutingEvent::CacheEntryEvicted {
                cache_key,
                was_present,
            } => info!(
                cache_key = %cache_key,
                was_present = was_present,
                "Evicted routing cache entry"
            ),
            RoutingEvent::VendorCacheEvicted {
                vendor_code,
                evicted,
            } => info!(
                vendor = %vendor_code,
                evicted = evicted,
                "Evicted vendor routing cache entries"
            ),
            RoutingEvent::CacheEvictionFailed { target, error } => warn!(
                eviction_target = %target,
                error = %error,
                "Cache eviction failed"
            ),
            RoutingEvent::SecretBundleRejected { vendor_code, error } => error!(
                vendor = %vendor_code,
                error = %error,
                "Could not parse secret bundle, forwarding with default headers"
            ),
            RoutingEvent::SecretHeaderSkipped {
                vendor_code,
                header,
            } => warn!(
                vendor = %vendor_code,
                header = %header,
                "Skipped secret bundle entry that is not a valid header"
            ),
            RoutingEvent::ForwardSucceeded {
                vendor_code,
                sender_id,
                target_url,
                status,
            } => info!(
                vendor = %vendor_code,
                wa_id = %sender_id,
                target_url = %target_url,
                status = status,
                "Request successfully forwarded"
            ),
            RoutingEvent::ForwardFailed {
                vendor_code,
                target_url,
                error,
            } => error!(
                vendor = %vendor_code,
                target_url = %target_url,
                error = %error,
                "Failed to forward request"
            ),
        }
    }
}

// ============================================================================
// Memory Logger
// ============================================================================

/// Logger that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoutingLogger {
    events: Arc<Mutex<Vec<RoutingEvent>>>,
}

impl MemoryRoutingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in order
    pub fn events(&self) -> Vec<RoutingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Check whether any recorded event satisfies the predicate
    pub fn contains(&self, predicate: impl Fn(&RoutingEvent) -> bool) -> bool {
        self.events
            .lock()
            .map(|events| events.iter().any(predicate))
            .unwrap_or(false)
    }

    /// Recorded events at the given level
    pub fn events_at(&self, level: RoutingEventLevel) -> Vec<RoutingEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level() == level)
            .collect()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl RoutingLogger for MemoryRoutingLogger {
    fn record(&self, event: RoutingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
#[path = "routing_log_tests.rs"]
mod tests;
