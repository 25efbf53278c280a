//! # WA-Router HTTP Service
//!
//! HTTP server receiving WhatsApp Cloud API webhooks on behalf of vendors
//! and routing each delivery to the right downstream environment.
//!
//! This service provides:
//! - Per-vendor webhook endpoint (`GET` verification handshake, `POST` delivery)
//! - Health check endpoint
//! - Prometheus metrics endpoint
//!
//! Routing failures behind a well-formed delivery are always answered with
//! `200 Could not process request.`; only malformed requests receive error
//! statuses.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    CacheConfig, ForwardingConfig, LoggingConfig, RoutingConfig, ServerConfig, ServiceConfig,
    WebhookConfig,
};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use metrics::outcome;
use responses::{
    challenge_response, failure_response, forwarded_response, health_response, VerificationQuery,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use subtle::ConstantTimeEq;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};
use wa_router_core::{ResolutionCache, RoutingFailure, RoutingPipeline, VendorCode};

const CORRELATION_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Extract, resolve, inject and forward pipeline
    pub pipeline: Arc<RoutingPipeline>,

    /// Resolution cache shared with the pipeline, read for metrics
    pub cache: Arc<dyn ResolutionCache>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        pipeline: Arc<RoutingPipeline>,
        cache: Arc<dyn ResolutionCache>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            cache,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let prefix = state.config.webhook.path_prefix.clone();
    let webhook_endpoint = get(handle_verification)
        .post(handle_delivery)
        .fallback(handle_method_not_allowed);

    let webhook_routes = Router::new()
        .route(&format!("{}/{{vendor_code}}", prefix), webhook_endpoint.clone())
        .route(&format!("{}/{{vendor_code}}/", prefix), webhook_endpoint);

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/health/", get(handle_health_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and serve until SIGINT/SIGTERM
pub async fn start_server(
    config: ServiceConfig,
    pipeline: Arc<RoutingPipeline>,
    cache: Arc<dyn ResolutionCache>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Invalid listen address '{}': {}", address, e),
        })
    })?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::new(config, pipeline, cache, metrics);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal(shutdown_timeout).await;
                let _ = signalled_tx.send(());
            })
            .await
    };

    // In-flight forwards get at most the shutdown timeout to finish.
    let deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(shutdown_timeout).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, dropping in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

fn parse_vendor_code(raw: String) -> Result<VendorCode, WebhookHandlerError> {
    VendorCode::new(raw.as_str())
        .map_err(|_| WebhookHandlerError::InvalidVendorCode { vendor_code: raw })
}

/// Handle the verification handshake
///
/// Echoes `hub.challenge` when `hub.mode` is `subscribe` and
/// `hub.verify_token` matches the configured token.
#[instrument(skip(state, query))]
pub async fn handle_verification(
    State(state): State<AppState>,
    Path(vendor_code): Path<String>,
    Query(query): Query<VerificationQuery>,
) -> Result<Response, WebhookHandlerError> {
    parse_vendor_code(vendor_code)?;

    let expected = state.config.webhook.verify_token.as_bytes();
    let supplied = query.verify_token.as_deref().unwrap_or_default().as_bytes();
    let token_matches = !expected.is_empty()
        && expected.len() == supplied.len()
        && bool::from(expected.ct_eq(supplied));

    if query.mode.as_deref() == Some("subscribe") && token_matches {
        state
            .metrics
            .verification_attempts_total
            .with_label_values(&["accepted"])
            .inc();
        info!("Verification handshake accepted");
        return Ok(challenge_response(query.challenge));
    }

    state
        .metrics
        .verification_attempts_total
        .with_label_values(&["rejected"])
        .inc();
    Err(WebhookHandlerError::VerificationFailed)
}

/// Handle a webhook delivery
///
/// The body must be JSON. Everything after parsing is answered with 200:
/// the downstream response on success, the uniform failure body otherwise.
#[instrument(skip(state, body), fields(body_size = body.len()))]
pub async fn handle_delivery(
    State(state): State<AppState>,
    Path(vendor_code): Path<String>,
    body: Bytes,
) -> Result<Response, WebhookHandlerError> {
    let vendor_code = parse_vendor_code(vendor_code)?;

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        state.metrics.record_delivery(outcome::INVALID_JSON);
        WebhookHandlerError::InvalidJson {
            message: e.to_string(),
        }
    })?;

    let timer = state.metrics.webhook_routing_duration.start_timer();
    let result = state.pipeline.route(&vendor_code, &payload).await;
    timer.observe_duration();

    match result {
        Ok(forwarded) => {
            state.metrics.record_delivery(outcome::FORWARDED);
            Ok(forwarded_response(forwarded))
        }
        Err(failure) => {
            state.metrics.record_delivery(failure_outcome(&failure));
            info!(
                vendor = %vendor_code,
                reason = %failure,
                "Delivery could not be routed, answering with failure body"
            );
            Ok(failure_response())
        }
    }
}

fn failure_outcome(failure: &RoutingFailure) -> &'static str {
    match failure {
        RoutingFailure::SenderNotFound { .. } => outcome::SENDER_NOT_FOUND,
        RoutingFailure::RouteNotFound { .. } => outcome::ROUTE_NOT_FOUND,
        RoutingFailure::Store(_) => outcome::STORE_ERROR,
        RoutingFailure::Forward { .. } => outcome::FORWARD_FAILED,
        RoutingFailure::Serialization { .. } => outcome::INTERNAL_ERROR,
    }
}

async fn handle_method_not_allowed() -> WebhookHandlerError {
    WebhookHandlerError::MethodNotAllowed
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

/// Basic health check endpoint
async fn handle_health_check() -> Response {
    health_response()
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    match state.cache.statistics().await {
        Ok(stats) => {
            state.metrics.cache_entries.set(stats.entries as i64);
            state.metrics.cache_hits.set(stats.hits as i64);
            state.metrics.cache_misses.set(stats.misses as i64);
        }
        Err(e) => warn!(error = %e, "Failed to read cache statistics"),
    }

    state
        .metrics
        .encode()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Middleware
// ============================================================================

/// Tags the request span with an `x-correlation-id` (generated when absent)
/// and echoes it on the response.
#[instrument(skip_all, fields(method = %request.method(), uri = %request.uri(), correlation_id))]
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    let start = std::time::Instant::now();
    let mut response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    if status.is_server_error() {
        error!(status = status.as_u16(), duration_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), duration_ms, "Request rejected");
    } else {
        info!(status = status.as_u16(), duration_ms, "Request completed");
    }

    response
}

/// Records request count and duration
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let timer = state.metrics.http_request_duration.start_timer();
    let response = next.run(request).await;
    timer.observe_duration();
    state.metrics.http_requests_total.inc();
    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
