//! Conversion of captured data into span attributes

use opentelemetry::KeyValue;
use serde_json::{Map, Value};

use crate::capture::CaptureOutcome;
use crate::redact::Redaction;

/// Flatten a JSON tree into dotted attribute names. Arrays are kept as one
/// JSON-encoded value, nulls are dropped.
pub fn flatten(prefix: &str, value: &Value, out: &mut Vec<KeyValue>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&name, child, out);
            }
        }
        Value::Null => {}
        Value::Bool(b) => out.push(KeyValue::new(prefix.to_string(), *b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => out.push(KeyValue::new(prefix.to_string(), i)),
            None => out.push(KeyValue::new(prefix.to_string(), n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => out.push(KeyValue::new(prefix.to_string(), s.clone())),
        Value::Array(_) => out.push(KeyValue::new(prefix.to_string(), value.to_string())),
    }
}

/// `<direction>.headers.<name>` attributes followed by top-level `token.*` claims.
pub fn header_attributes(direction: &str, redaction: &Redaction) -> Vec<KeyValue> {
    let headers: Map<String, Value> = redaction
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let mut section = Map::new();
    section.insert("headers".to_string(), Value::Object(headers));
    let mut tree = Map::new();
    tree.insert(direction.to_string(), Value::Object(section));

    let mut attributes = Vec::with_capacity(redaction.headers.len() + redaction.claims.len());
    flatten("", &Value::Object(tree), &mut attributes);
    attributes.extend(
        redaction
            .claims
            .iter()
            .map(|(name, value)| KeyValue::new(name.clone(), value.clone())),
    );
    attributes
}

/// One atomic body attribute. Oversized serializations are swapped for a
/// truncation marker so no value exceeds `max_body_size`.
pub fn body_attribute(name: &'static str, outcome: &CaptureOutcome, max_body_size: usize) -> KeyValue {
    let value = outcome.to_attribute_value();
    let value = if value.len() > max_body_size {
        CaptureOutcome::truncated(&value).to_attribute_value()
    } else {
        value
    };
    KeyValue::new(name, value)
}
