//! Common test utilities for wa-router integration tests
//!
//! This module provides:
//! - A harness wiring the real store, cache, forwarder and router together
//! - Helpers for seeding vendors and building webhook requests

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::{sync::Arc, time::Duration};
use wa_router_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use wa_router_core::{
    CacheInvalidator, Environment, EnvironmentCode, ForwarderConfig, HttpForwarder,
    InMemoryResolutionCache, InMemoryRuleStore, MemoryRoutingLogger, NewEnvironment,
    NewRoutingRule, NewVendor, ResolutionCache, Resolver, RoutingPipeline, RoutingRule,
    SecretInjector, SenderId, Vendor, VendorCode,
};

pub const VERIFY_TOKEN: &str = "integration-token";

// ============================================================================
// Harness
// ============================================================================

/// Fully wired router over in-memory infrastructure.
#[allow(dead_code)]
pub struct TestHarness {
    pub store: Arc<InMemoryRuleStore>,
    pub cache: Arc<InMemoryResolutionCache>,
    pub logger: Arc<MemoryRoutingLogger>,
    pub app: Router,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new() -> Self {
        Self::with_forward_timeout(Duration::from_secs(10))
    }

    pub fn with_forward_timeout(timeout: Duration) -> Self {
        let logger = Arc::new(MemoryRoutingLogger::new());
        let cache = Arc::new(InMemoryResolutionCache::new(Duration::from_secs(300)));
        let invalidator = Arc::new(CacheInvalidator::new(cache.clone(), logger.clone()));
        let store = Arc::new(InMemoryRuleStore::with_listener(invalidator));

        let forwarder = HttpForwarder::new(ForwarderConfig {
            timeout,
            ..ForwarderConfig::default()
        })
        .unwrap();
        let resolver = Resolver::new(store.clone(), cache.clone(), logger.clone());
        let pipeline = RoutingPipeline::new(
            resolver,
            SecretInjector::default(),
            Arc::new(forwarder),
            logger.clone(),
        );

        let mut config = ServiceConfig::default();
        config.webhook.verify_token = VERIFY_TOKEN.to_string();

        let shared_cache: Arc<dyn ResolutionCache> = cache.clone();
        let app = create_router(AppState::new(
            config,
            Arc::new(pipeline),
            shared_cache,
            ServiceMetrics::new().unwrap(),
        ));

        Self {
            store,
            cache,
            logger,
            app,
        }
    }

    /// Send one request through a fresh clone of the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;

        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn vendor(&self, code: &str, secret_bundle: Option<&str>) -> Vendor {
        let mut input = NewVendor::new(code.to_uppercase(), VendorCode::new(code).unwrap());
        if let Some(bundle) = secret_bundle {
            input = input.with_secret_bundle(bundle);
        }
        self.store.create_vendor(input).await.unwrap()
    }

    pub async fn environment(
        &self,
        vendor: &Vendor,
        code: &str,
        target_url: &str,
        is_default: bool,
    ) -> Environment {
        let mut input = NewEnvironment::new(
            vendor.id,
            code.to_uppercase(),
            EnvironmentCode::new(code).unwrap(),
            target_url,
        );
        if is_default {
            input = input.as_default();
        }
        self.store.create_environment(input).await.unwrap()
    }

    pub async fn rule(&self, environment: &Environment, wa_id: &str) -> RoutingRule {
        self.store
            .create_rule(NewRoutingRule::new(
                environment.id,
                SenderId::new(wa_id).unwrap(),
                format!("rule for {}", wa_id),
            ))
            .await
            .unwrap()
    }
}

// ============================================================================
// Request helpers
// ============================================================================

/// WhatsApp message notification sent by `sender`
#[allow(dead_code)]
pub fn message_payload(sender: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "messages": [{
                        "from": sender,
                        "id": "wamid.HBgLMTY1MDM4Nzk0MzkVAgASGBQzQTRBNjU5OUFFRTAzODEwMTQ0RgA=",
                        "type": "text",
                        "text": {"body": "hello"}
                    }]
                }
            }]
        }]
    })
}

#[allow(dead_code)]
pub fn delivery(vendor_code: &str, payload: &serde_json::Value) -> Request<Body> {
    raw_delivery(vendor_code, payload.to_string())
}

#[allow(dead_code)]
pub fn raw_delivery(vendor_code: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/webhook/meta/{}/", vendor_code))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
