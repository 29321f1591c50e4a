//! Request-side body capture

use super::{is_binary, pairs_to_json, parse_body_text, CaptureOutcome};
use crate::error::CaptureError;
use crate::fetch::RequestBody;

/// Capture a request body without consuming it.
pub fn capture_request_body(
    body: &RequestBody,
    headers: Option<&[(String, String)]>,
    max_body_size: usize,
) -> CaptureOutcome {
    let content_type = headers.and_then(content_type);

    match classify(body, content_type, max_body_size) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to capture request body");
            CaptureOutcome::error(e)
        }
    }
}

fn classify(
    body: &RequestBody,
    content_type: Option<&str>,
    max_body_size: usize,
) -> Result<CaptureOutcome, CaptureError> {
    match body {
        RequestBody::Multipart(_) => Ok(CaptureOutcome::FormData),
        RequestBody::UrlEncoded(pairs) => Ok(CaptureOutcome::Data(pairs_to_json(
            pairs.iter().cloned(),
        ))),
        RequestBody::Stream(_) => Ok(CaptureOutcome::Stream),
        RequestBody::Bytes(bytes) => {
            if is_binary(bytes) {
                return Ok(CaptureOutcome::Binary {
                    content_type: content_type.unwrap_or("bytes").to_string(),
                    size: Some(bytes.len()),
                });
            }
            let text = String::from_utf8_lossy(bytes);
            classify_text(&text, content_type, max_body_size)
        }
        RequestBody::Text(text) => classify_text(text, content_type, max_body_size),
        RequestBody::Json(value) => Ok(CaptureOutcome::Data(value.clone())),
    }
}

fn classify_text(
    text: &str,
    content_type: Option<&str>,
    max_body_size: usize,
) -> Result<CaptureOutcome, CaptureError> {
    if text.len() > max_body_size {
        tracing::debug!(size = text.len(), max_body_size, "Request body truncated");
        return Ok(CaptureOutcome::truncated(text));
    }
    parse_body_text(text, content_type)
}

/// Case-insensitive `content-type` lookup.
fn content_type(headers: &[(String, String)]) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.as_str())
}
