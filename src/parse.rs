//! Decoding of the API's per-page envelope.
//!
//! The API answers with a top-level array, `[metadata, rows]` on success or
//! `[{"message": [{"id", "key", "value"}, ...]}]` on error. Errors are usually
//! delivered with HTTP 200, so this is the layer that detects them.
//!
//! The API sometimes serializes `page`/`pages` as **strings**; we accept both
//! strings and numbers.

use crate::error::{Error, Result};
use crate::models::{Page, Row};
use serde_json::Value;

/// Parse one raw response body into a [`Page`].
///
/// ### Errors
/// - [`Error::Json`] when the body is not JSON
/// - [`Error::Application`] when the body carries an API error message
/// - [`Error::MalformedEnvelope`] when it matches neither shape
pub fn parse_page(raw: &str) -> Result<Page> {
    let v: Value = serde_json::from_str(raw)?;
    parse_envelope(&v)
}

/// Like [`parse_page`], for an already decoded JSON value.
pub fn parse_envelope(v: &Value) -> Result<Page> {
    if let Some(page) = success_shape(v) {
        return Ok(page);
    }
    Err(error_shape(v))
}

fn success_shape(v: &Value) -> Option<Page> {
    let arr = v.as_array()?;
    let meta = arr.first()?.as_object()?;
    let page = coerce_int(meta.get("page")?)?;
    let pages = coerce_int(meta.get("pages")?)?;
    let rows = match arr.get(1)? {
        // Queries without observations come back as `[meta, null]`.
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_object().cloned())
            .collect::<Option<Vec<Row>>>()?,
        _ => return None,
    };
    // An empty `lastupdated` means the same as a missing one.
    let last_updated = meta
        .get("lastupdated")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);
    Some(Page {
        rows,
        page,
        pages,
        last_updated,
    })
}

fn error_shape(v: &Value) -> Error {
    let message = v
        .get(0)
        .and_then(|meta| meta.get("message"))
        .and_then(|m| m.get(0));
    let field = |name: &str| message.and_then(|m| m.get(name)).map(display_value);

    match (field("id"), field("key"), field("value")) {
        (Some(id), Some(key), Some(value)) => Error::Application { id, key, value },
        _ => Error::MalformedEnvelope(
            serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        ),
    }
}

/// Integer from a JSON number or a numeric string.
fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
