//! Sender id extraction from WhatsApp Cloud API webhook payloads.
//!
//! The sender lives at `entry[0].changes[0].value.messages[0].from`. Status
//! callbacks and other notifications without a `messages` array simply have
//! no sender.

use serde_json::Value;

/// Extract the sender id (`wa_id`) from an inbound webhook payload.
///
/// Returns `None` when any segment of the path is missing, has the wrong
/// type, or is an empty sequence, and when the sender itself is not a
/// non-empty string. Never panics.
///
/// # Examples
///
/// ```rust
/// use wa_router_core::extract_sender_id;
///
/// let payload = serde_json::json!({
///     "entry": [{"changes": [{"value": {"messages": [{"from": "15551234567"}]}}]}]
/// });
/// assert_eq!(extract_sender_id(&payload).as_deref(), Some("15551234567"));
/// assert_eq!(extract_sender_id(&serde_json::json!({"entry": []})), None);
/// ```
pub fn extract_sender_id(payload: &Value) -> Option<String> {
    let sender = payload
        .get("entry")?
        .as_array()?
        .first()?
        .get("changes")?
        .as_array()?
        .first()?
        .get("value")?
        .get("messages")?
        .as_array()?
        .first()?
        .get("from")?
        .as_str()?;

    if sender.is_empty() {
        None
    } else {
        Some(sender.to_string())
    }
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
