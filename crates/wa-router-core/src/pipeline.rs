//! # Routing Pipeline
//!
//! Extract → resolve → inject → forward for one inbound delivery.
//!
//! Every failure is returned as a [`RoutingFailure`] and has already been
//! recorded through the injected [`RoutingLogger`] by the time the caller
//! sees it. Callers decide how failures are presented to the sender.

use crate::{
    extraction::extract_sender_id,
    forwarder::{ForwardError, ForwardRequest, ForwardedResponse, Forwarder},
    resolver::{ResolutionOutcome, Resolver},
    routing_log::{RoutingEvent, RoutingLogger},
    rule_store::RuleStoreError,
    secrets::SecretInjector,
    VendorCode,
};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// Why a delivery could not be routed.
#[derive(Debug, thiserror::Error)]
pub enum RoutingFailure {
    #[error("No sender id in payload for vendor '{vendor_code}'")]
    SenderNotFound { vendor_code: VendorCode },

    #[error("No routing rule or default environment for vendor '{vendor_code}', sender '{sender_id}'")]
    RouteNotFound {
        vendor_code: VendorCode,
        sender_id: String,
    },

    #[error("Rule store lookup failed: {0}")]
    Store(#[from] RuleStoreError),

    #[error("Forward to '{target_url}' failed: {source}")]
    Forward {
        target_url: String,
        #[source]
        source: ForwardError,
    },

    #[error("Payload could not be serialized: {message}")]
    Serialization { message: String },
}

/// End-to-end routing of inbound webhook payloads.
#[derive(Clone)]
pub struct RoutingPipeline {
    resolver: Resolver,
    injector: SecretInjector,
    forwarder: Arc<dyn Forwarder>,
    logger: Arc<dyn RoutingLogger>,
}

impl RoutingPipeline {
    pub fn new(
        resolver: Resolver,
        injector: SecretInjector,
        forwarder: Arc<dyn Forwarder>,
        logger: Arc<dyn RoutingLogger>,
    ) -> Self {
        Self {
            resolver,
            injector,
            forwarder,
            logger,
        }
    }

    /// Route one delivery for the vendor.
    ///
    /// The payload is re-serialized as-is and posted once to the resolved
    /// target.
    pub async fn route(
        &self,
        vendor_code: &VendorCode,
        payload: &Value,
    ) -> Result<ForwardedResponse, RoutingFailure> {
        let Some(sender_id) = extract_sender_id(payload) else {
            self.logger.record(RoutingEvent::SenderMissing {
                vendor_code: vendor_code.to_string(),
            });
            return Err(RoutingFailure::SenderNotFound {
                vendor_code: vendor_code.clone(),
            });
        };

        self.logger.record(RoutingEvent::SenderExtracted {
            vendor_code: vendor_code.to_string(),
            sender_id: sender_id.clone(),
        });

        let route = match self.resolver.resolve(vendor_code, &sender_id).await? {
            ResolutionOutcome::Resolved(resolved) => resolved.route,
            ResolutionOutcome::NotFound => {
                return Err(RoutingFailure::RouteNotFound {
                    vendor_code: vendor_code.clone(),
                    sender_id,
                })
            }
        };

        let injected = self.injector.headers_for(route.secret_bundle.as_ref());
        if let Some(e) = &injected.bundle_error {
            self.logger.record(RoutingEvent::SecretBundleRejected {
                vendor_code: vendor_code.to_string(),
                error: e.to_string(),
            });
        }
        for header in &injected.skipped {
            self.logger.record(RoutingEvent::SecretHeaderSkipped {
                vendor_code: vendor_code.to_string(),
                header: header.clone(),
            });
        }

        let body = serde_json::to_vec(payload).map_err(|e| RoutingFailure::Serialization {
            message: e.to_string(),
        })?;

        let request = ForwardRequest {
            target_url: route.target_url.clone(),
            body: Bytes::from(body),
            headers: injected.headers,
        };

        match self.forwarder.forward(request).await {
            Ok(response) => {
                self.logger.record(RoutingEvent::ForwardSucceeded {
                    vendor_code: vendor_code.to_string(),
                    sender_id,
                    target_url: route.target_url,
                    status: response.status,
                });
                Ok(response)
            }
            Err(e) => {
                self.logger.record(RoutingEvent::ForwardFailed {
                    vendor_code: vendor_code.to_string(),
                    target_url: route.target_url.clone(),
                    error: e.to_string(),
                });
                Err(RoutingFailure::Forward {
                    target_url: route.target_url,
                    source: e,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
