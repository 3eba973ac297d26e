//! Recursive redaction of sensitive fields before audit persistence.

use serde_json::Value;

/// Marker written in place of any sensitive value.
pub const REDACTION_MARKER: &str = "***REDACTED***";

/// Field names whose values are never persisted, at any nesting depth.
///
/// Matched case-insensitively. Covers both English and Portuguese field
/// names used across the ERP payloads.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "senha",
    "token",
    "secret",
    "credit_card",
    "cartao",
    "cvv",
    "cpf_completo",
];

/// Returns a copy of `value` with every sensitive field replaced by
/// [`REDACTION_MARKER`], recursing through nested objects and arrays.
pub fn redact(value: &Value) -> Value {
    let mut out = value.clone();
    redact_in_place(&mut out);
    out
}

/// In-place variant of [`redact`].
pub fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive(key) {
                    *entry = Value::String(REDACTION_MARKER.to_string());
                } else {
                    redact_in_place(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_in_place(item);
            }
        }
        _ => {}
    }
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_FIELDS
        .iter()
        .any(|field| key.eq_ignore_ascii_case(field))
}
