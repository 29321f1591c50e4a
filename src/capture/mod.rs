//! Body classification and decoding for span capture
//!
//! Every entry point returns a [`CaptureOutcome`] and never fails: anything
//! that goes wrong while reading or decoding a body becomes
//! [`CaptureOutcome::Error`].

pub mod request;
pub mod response;

pub use request::capture_request_body;
pub use response::capture_response_body;

use serde_json::{json, Map, Value};

use crate::error::CaptureError;

/// Characters kept from an oversized body.
pub const PREVIEW_CHARS: usize = 100;

/// Share of low control bytes above which a buffer is treated as binary.
const BINARY_CONTROL_RATIO: f64 = 0.3;

/// What ended up being captured for one body.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Decoded structured data.
    Data(Value),
    /// Raw text, kept verbatim.
    Text(String),
    Binary {
        content_type: String,
        size: Option<usize>,
    },
    Truncated {
        size: usize,
        preview: Option<String>,
    },
    FormData,
    Stream,
    Error(String),
}

impl CaptureOutcome {
    /// Truncation marker keeping the first [`PREVIEW_CHARS`] characters.
    pub fn truncated(text: &str) -> Self {
        CaptureOutcome::Truncated {
            size: text.len(),
            preview: Some(text.chars().take(PREVIEW_CHARS).collect()),
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        CaptureOutcome::Error(err.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            CaptureOutcome::Data(value) => value.clone(),
            CaptureOutcome::Text(text) => Value::String(text.clone()),
            CaptureOutcome::Binary { content_type, size } => {
                let mut marker = json!({ "_binary": true, "type": content_type });
                if let Some(size) = size {
                    marker["size"] = json!(size);
                }
                marker
            }
            CaptureOutcome::Truncated { size, preview } => {
                let mut marker = json!({ "_truncated": true, "size": size });
                if let Some(preview) = preview {
                    marker["preview"] = json!(preview);
                }
                marker
            }
            CaptureOutcome::FormData => json!({
                "_skipped": "form-data",
                "reason": "multipart bodies may carry files and are not captured",
            }),
            CaptureOutcome::Stream => json!({
                "_skipped": "stream",
                "reason": "streamed bodies are not consumed",
            }),
            CaptureOutcome::Error(message) => json!({ "_error": message }),
        }
    }

    /// Span attribute value: text as-is, everything else JSON-encoded.
    pub fn to_attribute_value(&self) -> String {
        match self {
            CaptureOutcome::Text(text) => text.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// Parse body text according to its declared content type.
///
/// A body declared as `application/json` must parse; every other declared
/// or undeclared type falls back to the raw text when it is not JSON.
pub fn parse_body_text(
    text: &str,
    content_type: Option<&str>,
) -> Result<CaptureOutcome, CaptureError> {
    let Some(content_type) = content_type else {
        return Ok(parse_json_lenient(text));
    };

    if content_type.contains("application/json") {
        let value: Value = serde_json::from_str(text)?;
        Ok(CaptureOutcome::Data(value))
    } else if content_type.contains("application/x-www-form-urlencoded") {
        Ok(CaptureOutcome::Data(decode_form(text.as_bytes())))
    } else if content_type.contains("text/") {
        Ok(CaptureOutcome::Text(text.to_string()))
    } else {
        Ok(parse_json_lenient(text))
    }
}

fn parse_json_lenient(text: &str) -> CaptureOutcome {
    match serde_json::from_str(text) {
        Ok(value) => CaptureOutcome::Data(value),
        Err(_) => CaptureOutcome::Text(text.to_string()),
    }
}

/// Flat string mapping from URL-encoded pairs. Later duplicates win.
pub fn decode_form(encoded: &[u8]) -> Value {
    pairs_to_json(url::form_urlencoded::parse(encoded).into_owned())
}

pub(crate) fn pairs_to_json<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Value::Object(map)
}

/// Heuristic binary check: more than 30% of bytes are control characters
/// other than tab, newline and carriage return.
pub fn is_binary(bytes: &[u8]) -> bool {
    let control = bytes
        .iter()
        .filter(|&&b| b < 32 && !matches!(b, b'\t' | b'\n' | b'\r'))
        .count();
    control as f64 > bytes.len() as f64 * BINARY_CONTROL_RATIO
}
