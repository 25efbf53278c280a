//! Tests for webhook routing in the HTTP layer.

use super::*;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::sync::Mutex;
use tower::ServiceExt;
use wa_router_core::{
    EnvironmentCode, ForwardError, ForwardRequest, ForwardedResponse, Forwarder,
    InMemoryResolutionCache, InMemoryRuleStore, MemoryRoutingLogger, NewEnvironment,
    NewRoutingRule, NewVendor, Resolver, SecretInjector, SenderId,
};

// ============================================================================
// Test doubles
// ============================================================================

/// Forwarder recording targets and answering with a preset result.
struct StubForwarder {
    targets: Mutex<Vec<String>>,
    result: Result<ForwardedResponse, ForwardError>,
}

impl StubForwarder {
    fn answering(result: Result<ForwardedResponse, ForwardError>) -> Arc<Self> {
        Arc::new(Self {
            targets: Mutex::new(Vec::new()),
            result,
        })
    }

    fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for StubForwarder {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardedResponse, ForwardError> {
        self.targets.lock().unwrap().push(request.target_url);
        self.result.clone()
    }
}

// ============================================================================
// Test helpers
// ============================================================================

const VERIFY_TOKEN: &str = "verify-me";

fn downstream_ok() -> Result<ForwardedResponse, ForwardError> {
    Ok(ForwardedResponse {
        status: 201,
        content_type: Some("application/json".to_string()),
        body: Bytes::from_static(br#"{"accepted":true}"#),
    })
}

async fn test_app(forwarder: Arc<StubForwarder>) -> Router {
    let store = InMemoryRuleStore::new();
    let vendor = store
        .create_vendor(NewVendor::new("Acme", VendorCode::new("acme").unwrap()))
        .await
        .unwrap();
    let dev = store
        .create_environment(
            NewEnvironment::new(
                vendor.id,
                "Development",
                EnvironmentCode::new("dev").unwrap(),
                "https://dev.acme.test/hook",
            )
            .as_default(),
        )
        .await
        .unwrap();
    store
        .create_rule(NewRoutingRule::new(
            dev.id,
            SenderId::new("111").unwrap(),
            "Dev phone",
        ))
        .await
        .unwrap();

    let cache: Arc<dyn ResolutionCache> = Arc::new(InMemoryResolutionCache::default());
    let logger = Arc::new(MemoryRoutingLogger::new());
    let resolver = Resolver::new(Arc::new(store), cache.clone(), logger.clone());
    let pipeline = RoutingPipeline::new(resolver, SecretInjector::default(), forwarder, logger);

    let mut config = ServiceConfig::default();
    config.webhook.verify_token = VERIFY_TOKEN.to_string();

    create_router(AppState::new(
        config,
        Arc::new(pipeline),
        cache,
        ServiceMetrics::new().unwrap(),
    ))
}

fn delivery(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn message_from(sender: &str) -> String {
    serde_json::json!({
        "entry": [{"changes": [{"value": {"messages": [{"from": sender}]}}]}]
    })
    .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ============================================================================
// Verification handshake
// ============================================================================

mod verification {
    use super::*;

    #[tokio::test]
    async fn test_valid_handshake_echoes_challenge() {
        let app = test_app(StubForwarder::answering(downstream_ok())).await;

        let response = app
            .oneshot(
                Request::get(format!(
                    "/webhook/meta/acme?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
                    VERIFY_TOKEN
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "1158201444");
    }

    #[tokio::test]
    async fn test_wrong_token_is_rejected() {
        let app = test_app(StubForwarder::answering(downstream_ok())).await;

        let response = app
            .oneshot(
                Request::get("/webhook/meta/acme?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid verification request");
    }

    #[tokio::test]
    async fn test_wrong_mode_is_rejected() {
        let app = test_app(StubForwarder::answering(downstream_ok())).await;

        let response = app
            .oneshot(
                Request::get(format!(
                    "/webhook/meta/acme?hub.mode=unsubscribe&hub.verify_token={}&hub.challenge=1",
                    VERIFY_TOKEN
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_parameters_are_rejected() {
        let app = test_app(StubForwarder::answering(downstream_ok())).await;

        let response = app
            .oneshot(Request::get("/webhook/meta/acme/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Deliveries
// ============================================================================

mod deliveries {
    use super::*;

    #[tokio::test]
    async fn test_routed_delivery_mirrors_downstream() {
        let forwarder = StubForwarder::answering(downstream_ok());
        let app = test_app(forwarder.clone()).await;

        let response = app
            .oneshot(delivery("/webhook/meta/acme/", &message_from("111")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_text(response).await, r#"{"accepted":true}"#);
        assert_eq!(forwarder.targets(), vec!["https://dev.acme.test/hook"]);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let forwarder = StubForwarder::answering(downstream_ok());
        let app = test_app(forwarder.clone()).await;

        let response = app
            .oneshot(delivery("/webhook/meta/acme", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid JSON");
        assert!(forwarder.targets().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sender_gets_generic_failure() {
        let forwarder = StubForwarder::answering(downstream_ok());
        let app = test_app(forwarder.clone()).await;

        let response = app
            .oneshot(delivery("/webhook/meta/acme", r#"{"entry":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, responses::FAILURE_BODY);
        assert!(forwarder.targets().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_vendor_gets_generic_failure() {
        let forwarder = StubForwarder::answering(downstream_ok());
        let app = test_app(forwarder.clone()).await;

        let response = app
            .oneshot(delivery("/webhook/meta/globex", &message_from("111")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, responses::FAILURE_BODY);
    }

    #[tokio::test]
    async fn test_forward_failure_gets_generic_failure() {
        let forwarder = StubForwarder::answering(Err(ForwardError::Status { status: 500 }));
        let app = test_app(forwarder.clone()).await;

        let response = app
            .oneshot(delivery("/webhook/meta/acme", &message_from("111")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, responses::FAILURE_BODY);
        assert_eq!(forwarder.targets().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_vendor_code_is_not_found() {
        let app = test_app(StubForwarder::answering(downstream_ok())).await;

        let response = app
            .oneshot(delivery("/webhook/meta/bad%20code", &message_from("111")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Other endpoints and methods
// ============================================================================

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let app = test_app(StubForwarder::answering(downstream_ok())).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/webhook/meta/acme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(response).await, "Method not allowed");
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app(StubForwarder::answering(downstream_ok())).await;

    let response = app
        .oneshot(Request::get("/health/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Health check OK");
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = test_app(StubForwarder::answering(downstream_ok())).await;

    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-correlation-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-correlation-id"], "abc-123");
}

#[tokio::test]
async fn test_metrics_report_delivery_outcomes() {
    let app = test_app(StubForwarder::answering(downstream_ok())).await;

    app.clone()
        .oneshot(delivery("/webhook/meta/acme", &message_from("111")))
        .await
        .unwrap();
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains(r#"webhook_deliveries_total{outcome="forwarded"} 1"#));
    assert!(text.contains("routing_cache_entries 1"));
}

#[tokio::test]
async fn test_correlation_id_is_generated_when_absent() {
    let app = test_app(StubForwarder::answering(downstream_ok())).await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let generated = response.headers()["x-correlation-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}
