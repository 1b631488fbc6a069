//! Field lookup inside structured (JSON) secret payloads.

use serde_json::Value;

use crate::config::SecretRef;
use crate::error::{DenvError, Result};

/// Apply `reference.property` to a raw payload. Without a property the
/// payload is returned untouched.
pub fn select_property(payload: Vec<u8>, reference: &SecretRef) -> Result<Vec<u8>> {
    match reference.property.as_deref() {
        None | Some("") => Ok(payload),
        Some(property) => extract_property(&payload, &reference.key, property),
    }
}

/// Look up a dot-separated path (`db.credentials.password`, `hosts.0`) in a
/// JSON payload. String leaves come back without quotes; any other leaf is
/// returned as its compact JSON text.
pub fn extract_property(payload: &[u8], key: &str, property: &str) -> Result<Vec<u8>> {
    let not_found = || DenvError::PropertyNotFound {
        key: key.to_string(),
        property: property.to_string(),
    };

    let document: Value = serde_json::from_slice(payload).map_err(|_| not_found())?;

    let mut current = &document;
    for segment in property.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(not_found)?;
    }

    let text = match current {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(text.into_bytes())
}
