//! Response bodies and query parameters for the webhook endpoints.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use wa_router_core::ForwardedResponse;

/// Body returned for every routing failure behind a well-formed delivery.
pub const FAILURE_BODY: &str = "Could not process request.";

/// Body of the liveness endpoint.
pub const HEALTH_BODY: &str = "Health check OK";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Query parameters of the verification handshake
#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,

    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,

    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// 200 echoing the handshake challenge
pub fn challenge_response(challenge: Option<String>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        challenge.unwrap_or_default(),
    )
        .into_response()
}

/// 200 with the uniform routing failure body
pub fn failure_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        FAILURE_BODY,
    )
        .into_response()
}

/// 200 mirroring the downstream body and content type
pub fn forwarded_response(forwarded: ForwardedResponse) -> Response {
    let mut response = (StatusCode::OK, forwarded.body).into_response();

    match forwarded
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        Some(value) => {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        None => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }

    response
}

/// 200 liveness response
pub fn health_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        HEALTH_BODY,
    )
        .into_response()
}
