//! # Resolution Cache Module
//!
//! Read-through cache of resolved routes keyed by (vendor code, sender id).
//!
//! The cache is shared by every request handler. Concurrent misses for the
//! same key may both resolve and both write the same value; no single-flight
//! coordination is imposed.

use crate::{model::SecretBundle, EnvironmentCode, VendorCode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Default expiry applied by [`ResolutionCache::set`] when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

// ============================================================================
// Core Types
// ============================================================================

/// Cache key for one (vendor, sender) pair.
///
/// Rendered as `rule:{vendor_code}:{sender_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    vendor_code: VendorCode,
    sender_id: String,
}

impl CacheKey {
    /// Build the key the resolver and the invalidation listener share
    pub fn new(vendor_code: &VendorCode, sender_id: &str) -> Self {
        Self {
            vendor_code: vendor_code.clone(),
            sender_id: sender_id.to_string(),
        }
    }

    /// Vendor part of the key
    pub fn vendor_code(&self) -> &VendorCode {
        &self.vendor_code
    }

    /// Sender part of the key
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule:{}:{}", self.vendor_code, self.sender_id)
    }
}

/// Last-resolved target for a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoute {
    pub target_url: String,
    pub secret_bundle: Option<SecretBundle>,
    pub environment_name: String,
    pub environment_code: EnvironmentCode,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired_removed: u64,
    pub evictions: u64,
    pub hit_ratio: f64,
}

// ============================================================================
// Interface Traits
// ============================================================================

/// Shared key/value store of resolved routes.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Get the cached route if present and not expired
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRoute>, CacheError>;

    /// Store a route with the cache's default expiry
    async fn set(&self, key: CacheKey, route: CachedRoute) -> Result<(), CacheError>;

    /// Remove a key. Returns whether an entry was present.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Remove every entry of a vendor. Returns the number of entries removed.
    async fn delete_vendor(&self, vendor_code: &VendorCode) -> Result<usize, CacheError>;

    /// Get cache statistics
    async fn statistics(&self) -> Result<CacheStatistics, CacheError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by cache backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache unavailable: {message}")]
    Unavailable { message: String },
}
