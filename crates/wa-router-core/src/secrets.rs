//! # Secret Injection
//!
//! Builds the outbound header set for a forward: the default headers plus
//! every entry of the vendor's secret bundle.
//!
//! A bundle that is absent, blank, not JSON or not a JSON object is never
//! fatal. The forward proceeds with the default headers and the reason is
//! reported back to the caller for logging.

use crate::model::SecretBundle;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;

/// Default identifying user agent for forwarded requests.
pub const DEFAULT_USER_AGENT: &str = "W-Router/1.0";

/// Reasons a secret bundle could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretBundleError {
    #[error("Secret bundle is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Secret bundle must be a JSON object, found {found}")]
    NotAnObject { found: String },
}

/// Headers produced for one forward.
#[derive(Debug, Clone)]
pub struct InjectedHeaders {
    /// Default headers overlaid with the bundle's entries
    pub headers: HeaderMap,

    /// Bundle entries that could not become a header (names only)
    pub skipped: Vec<String>,

    /// Why the bundle was not merged at all, if it was present but unusable
    pub bundle_error: Option<SecretBundleError>,
}

/// Merges secret bundles over a fixed set of default headers.
#[derive(Debug, Clone)]
pub struct SecretInjector {
    user_agent: HeaderValue,
}

impl SecretInjector {
    /// Create an injector sending `user_agent` by default.
    ///
    /// Falls back to [`DEFAULT_USER_AGENT`] if the value is not a valid
    /// header value.
    pub fn new(user_agent: &str) -> Self {
        let user_agent = HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        Self { user_agent }
    }

    /// Headers always present before injection
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers
    }

    /// Build the header set for a vendor's bundle
    pub fn headers_for(&self, bundle: Option<&SecretBundle>) -> InjectedHeaders {
        let mut injected = InjectedHeaders {
            headers: self.default_headers(),
            skipped: Vec::new(),
            bundle_error: None,
        };

        let Some(bundle) = bundle.filter(|b| !b.is_blank()) else {
            return injected;
        };

        let entries = match parse_bundle(bundle) {
            Ok(entries) => entries,
            Err(e) => {
                injected.bundle_error = Some(e);
                return injected;
            }
        };

        for (name, value) in entries {
            let Some(text) = header_text(&value) else {
                injected.skipped.push(name);
                continue;
            };

            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&text),
            ) {
                (Ok(header_name), Ok(header_value)) => {
                    injected.headers.insert(header_name, header_value);
                }
                _ => injected.skipped.push(name),
            }
        }

        injected
    }
}

impl Default for SecretInjector {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

fn parse_bundle(bundle: &SecretBundle) -> Result<serde_json::Map<String, Value>, SecretBundleError> {
    let parsed: Value = serde_json::from_str(bundle.expose_secret()).map_err(|e| {
        SecretBundleError::InvalidJson {
            message: e.to_string(),
        }
    })?;

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(SecretBundleError::NotAnObject {
            found: json_kind(&other).to_string(),
        }),
    }
}

/// Header text for a bundle value. Nested values and null carry no header.
fn header_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
