//! JSON output formatting for pantry.

use serde::Serialize;
use serde_json::json;

use crate::error::PantryError;
use crate::features::cache::CacheSummary;
use crate::features::queue::{DiscardedRequest, QueuedRequest};
use crate::http::Response;

/// Format queued requests as JSON
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_queue_json(records: &[QueuedRequest]) -> Result<String, PantryError> {
    let output = json!({
        "count": records.len(),
        "items": records
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format discarded requests as JSON
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_discarded_json(records: &[DiscardedRequest]) -> Result<String, PantryError> {
    let output = json!({
        "count": records.len(),
        "items": records
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format cache summaries as JSON
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_caches_json(caches: &[CacheSummary]) -> Result<String, PantryError> {
    let output = json!({
        "count": caches.len(),
        "items": caches
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format a response as JSON. A JSON body is embedded as a value, anything
/// else as text.
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_response_json(response: &Response) -> Result<String, PantryError> {
    let body = serde_json::from_slice::<serde_json::Value>(&response.body)
        .unwrap_or_else(|_| serde_json::Value::String(response.text()));
    let output = json!({
        "status": response.status,
        "headers": response.headers,
        "body": body
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Serialize any value as pretty JSON
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, PantryError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::queue::NewQueuedRequest;
    use crate::http::{Method, Request};

    fn make_record(url: &str) -> QueuedRequest {
        let request = Request::parse(Method::Post, url)
            .unwrap()
            .with_body(r#"{"name":"Oat milk"}"#);
        NewQueuedRequest::from_request(&request).unwrap().with_id(1)
    }

    #[test]
    fn test_format_queue_json() {
        let records = vec![make_record("https://api.test/items")];
        let json = format_queue_json(&records).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["items"][0]["method"], "POST");
        assert_eq!(parsed["items"][0]["url"], "https://api.test/items");
    }

    #[test]
    fn test_format_response_json_embeds_json_body() {
        let response = Response::new(200, r#"[{"id":1}]"#);
        let parsed: serde_json::Value =
            serde_json::from_str(&format_response_json(&response).unwrap()).unwrap();

        assert_eq!(parsed["status"], 200);
        assert_eq!(parsed["body"][0]["id"], 1);
    }

    #[test]
    fn test_format_response_json_text_body() {
        let response = Response::new(500, "upstream down");
        let parsed: serde_json::Value =
            serde_json::from_str(&format_response_json(&response).unwrap()).unwrap();

        assert_eq!(parsed["body"], "upstream down");
    }
}
