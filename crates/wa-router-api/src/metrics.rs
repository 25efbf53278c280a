//! Metrics collection for the API service.
//!
//! Each [`ServiceMetrics`] owns its own registry so independent routers (and
//! tests) never collide on metric names.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Outcome label values for `webhook_deliveries_total`.
pub mod outcome {
    pub const FORWARDED: &str = "forwarded";
    pub const SENDER_NOT_FOUND: &str = "sender_not_found";
    pub const ROUTE_NOT_FOUND: &str = "route_not_found";
    pub const STORE_ERROR: &str = "store_error";
    pub const FORWARD_FAILED: &str = "forward_failed";
    pub const INVALID_JSON: &str = "invalid_json";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounter,
    pub http_request_duration: Histogram,

    // Webhook routing metrics
    pub webhook_deliveries_total: IntCounterVec,
    pub webhook_routing_duration: Histogram,
    pub verification_attempts_total: IntCounterVec,

    // Cache metrics, refreshed on scrape
    pub cache_entries: IntGauge,
    pub cache_hits: IntGauge,
    pub cache_misses: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;
        let webhook_deliveries_total = IntCounterVec::new(
            Opts::new(
                "webhook_deliveries_total",
                "Webhook deliveries by routing outcome",
            ),
            &["outcome"],
        )?;
        let webhook_routing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_routing_duration_seconds",
                "Time to resolve and forward one delivery",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let verification_attempts_total = IntCounterVec::new(
            Opts::new(
                "webhook_verification_attempts_total",
                "Verification handshakes by result",
            ),
            &["result"],
        )?;
        let cache_entries = IntGauge::new("routing_cache_entries", "Live resolution cache entries")?;
        let cache_hits = IntGauge::new("routing_cache_hits", "Resolution cache hits since start")?;
        let cache_misses =
            IntGauge::new("routing_cache_misses", "Resolution cache misses since start")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(webhook_deliveries_total.clone()))?;
        registry.register(Box::new(webhook_routing_duration.clone()))?;
        registry.register(Box::new(verification_attempts_total.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            webhook_deliveries_total,
            webhook_routing_duration,
            verification_attempts_total,
            cache_entries,
            cache_hits,
            cache_misses,
        }))
    }

    /// Count one delivery outcome
    pub fn record_delivery(&self, outcome: &str) {
        self.webhook_deliveries_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
