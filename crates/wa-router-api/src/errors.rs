//! Error types for the HTTP service

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Inbound request rejections with HTTP status code mapping
///
/// Only problems with the inbound request itself are surfaced as error
/// statuses. Routing failures behind a well-formed delivery never reach this
/// type; they are answered with a uniform 200 so webhook senders learn
/// nothing about internal routing state.
///
/// All bodies are short plain-text messages.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Delivery body is not valid JSON
    ///
    /// Maps to: `400 Bad Request`
    #[error("Invalid JSON")]
    InvalidJson { message: String },

    /// Verification handshake with a wrong mode or token
    ///
    /// Maps to: `400 Bad Request`
    #[error("Invalid verification request")]
    VerificationFailed,

    /// Vendor path segment is not a valid vendor code
    ///
    /// Maps to: `404 Not Found`
    #[error("Not found")]
    InvalidVendorCode { vendor_code: String },

    /// Any method other than GET or POST on a webhook endpoint
    ///
    /// Maps to: `405 Method Not Allowed`
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson { .. } | Self::VerificationFailed => StatusCode::BAD_REQUEST,
            Self::InvalidVendorCode { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        match &self {
            Self::InvalidJson { message } => {
                warn!(error = %message, "Rejected delivery with malformed JSON");
            }
            Self::VerificationFailed => warn!("Rejected verification handshake"),
            Self::InvalidVendorCode { vendor_code } => {
                warn!(vendor = %vendor_code, "Rejected request for invalid vendor code");
            }
            Self::MethodNotAllowed => {}
        }

        (
            self.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ServiceError {
    /// Process exit code for the error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}
