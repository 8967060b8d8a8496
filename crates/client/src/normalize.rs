//! The backend wraps payloads inconsistently (`{data: {...}}`, top-level
//! fields, bare arrays). These helpers pull values out of whichever shape
//! arrived.

use bayan_core::errors::{BookingError, BookingResult};
use eyre::eyre;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// False for the values a JavaScript `||` chain would skip.
fn present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// First present value among JSON pointers, tried in order.
pub(crate) fn first<'a>(body: &'a Value, pointers: &[&str]) -> Option<&'a Value> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find(|value| present(value))
}

/// Like [`first`], falling back to the whole body.
pub(crate) fn first_or_body<'a>(body: &'a Value, pointers: &[&str]) -> &'a Value {
    first(body, pointers).unwrap_or(body)
}

pub(crate) fn string_at(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(id_string)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// User-facing failure text: `message`, then `error`, then a raw text body.
pub(crate) fn failure_message(body: &Value) -> Option<String> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    field("message").or_else(|| field("error")).or_else(|| {
        body.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Text bodies that are not JSON are kept as a JSON string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// The plan list from any of the shapes the plans endpoints return.
pub(crate) fn plans_array(body: &Value) -> Option<&Vec<Value>> {
    body.pointer("/data/subscriptionPlans")
        .and_then(Value::as_array)
        .or_else(|| body.pointer("/data/plans").and_then(Value::as_array))
        .or_else(|| body.get("plans").and_then(Value::as_array))
        .or_else(|| body.as_array())
        .or_else(|| {
            body.get("data")
                .and_then(Value::as_object)
                .and_then(|data| data.values().find_map(Value::as_array))
        })
}

pub(crate) fn subscription_id(body: &Value) -> Option<String> {
    string_at(
        body,
        &[
            "/data/subscription/id",
            "/data/subscription/_id",
            "/subscription/id",
            "/subscription/_id",
            "/subscriptionId",
            "/id",
            "/_id",
        ],
    )
}

pub(crate) fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> BookingResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| BookingError::Internal(eyre!("Unexpected {} payload: {}", what, e)))
}

/// Decode each array element, skipping the ones that do not fit `T`.
pub(crate) fn decode_list<T: DeserializeOwned>(items: &[Value], what: &str) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

/// The first array found under `pointers`, decoded leniently.
pub(crate) fn list_at<T: DeserializeOwned>(body: &Value, pointers: &[&str], what: &str) -> Vec<T> {
    first(body, pointers)
        .and_then(Value::as_array)
        .map(|items| decode_list(items, what))
        .unwrap_or_default()
}
