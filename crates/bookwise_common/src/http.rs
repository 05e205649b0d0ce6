//! HTTP helpers shared by API clients.

use crate::error::SlotbookError;

// Include the client module
pub mod client;

/// Builds the error for a non-success response.
///
/// JSON bodies carrying `detail`, `error` or `message` contribute that text;
/// anything else is used verbatim (or the status alone for empty bodies).
pub fn error_from_response(status: u16, body: &str) -> SlotbookError {
    SlotbookError::from_status(status, extract_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.trim().to_string()
        }
    }))
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"].iter().find_map(|key| {
        match value.get(*key)? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Object(inner) => inner
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        }
    })
}
