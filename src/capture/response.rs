//! Response-side body capture

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

use super::{parse_body_text, CaptureOutcome};
use crate::error::CaptureError;
use crate::fetch::Response;

/// Content types whose bodies are never read.
pub const BINARY_CONTENT_TYPES: &[&str] = &[
    "image/",
    "video/",
    "audio/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "multipart/form-data",
];

/// Capture a response body.
///
/// Takes a duplicate handle; the caller's own copy of the response stays
/// readable whatever happens here.
pub async fn capture_response_body(duplicate: Response, max_body_size: usize) -> CaptureOutcome {
    match classify(duplicate, max_body_size).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to capture response body");
            CaptureOutcome::error(e)
        }
    }
}

async fn classify(
    duplicate: Response,
    max_body_size: usize,
) -> Result<CaptureOutcome, CaptureError> {
    let headers = duplicate.headers();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());

    if let Some(length) = content_length.filter(|&length| length > max_body_size) {
        tracing::debug!(length, max_body_size, "Response body too large, not read");
        return Ok(CaptureOutcome::Truncated {
            size: length,
            preview: None,
        });
    }

    if let Some(content_type) = content_type.as_deref().filter(|ct| is_binary_type(ct)) {
        return Ok(CaptureOutcome::Binary {
            content_type: content_type.to_string(),
            size: content_length,
        });
    }

    let text = duplicate
        .text()
        .await
        .map_err(|e| CaptureError::Body(e.to_string()))?;

    if text.len() > max_body_size {
        tracing::debug!(size = text.len(), max_body_size, "Response body truncated");
        return Ok(CaptureOutcome::truncated(&text));
    }

    parse_body_text(&text, content_type.as_deref())
}

fn is_binary_type(content_type: &str) -> bool {
    let lower = content_type.to_lowercase();
    BINARY_CONTENT_TYPES.iter().any(|t| lower.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::StatusCode;
    use serde_json::json;

    fn response(headers: &[(&'static str, &'static str)], body: impl Into<Bytes>) -> Response {
        let mut map = HeaderMap::new();
        for &(name, value) in headers {
            map.insert(name, HeaderValue::from_static(value));
        }
        Response::new(StatusCode::OK, map, body)
    }

    #[tokio::test]
    async fn test_json_response_parsed() {
        let original = response(&[("content-type", "application/json")], r#"{"id":7}"#);
        let outcome = capture_response_body(original.clone(), 10_000).await;

        assert_eq!(outcome, CaptureOutcome::Data(json!({"id": 7})));
        assert_eq!(original.text().await.unwrap(), r#"{"id":7}"#);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_not_read() {
        let original = response(&[("content-length", "50000")], "small");
        let outcome = capture_response_body(original, 10_000).await;
        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                size: 50_000,
                preview: None,
            }
        );
    }

    #[tokio::test]
    async fn test_binary_content_type_skipped() {
        let original = response(
            &[("content-type", "image/png"), ("content-length", "4")],
            "\u{0}PNG",
        );
        let outcome = capture_response_body(original, 10_000).await;
        assert_eq!(
            outcome,
            CaptureOutcome::Binary {
                content_type: "image/png".to_string(),
                size: Some(4),
            }
        );
    }

    #[tokio::test]
    async fn test_realized_length_over_limit_truncated() {
        let original = response(&[("content-type", "text/plain")], "y".repeat(300));
        let outcome = capture_response_body(original, 200).await;
        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                size: 300,
                preview: Some("y".repeat(100)),
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_declared_json_is_error_marker() {
        let original = response(&[("content-type", "application/json")], "<html>oops</html>");
        let outcome = capture_response_body(original, 10_000).await;
        assert!(matches!(outcome, CaptureOutcome::Error(_)));
    }

    #[tokio::test]
    async fn test_undeclared_text_kept_raw() {
        let original = response(&[], "pong");
        let outcome = capture_response_body(original, 10_000).await;
        assert_eq!(outcome, CaptureOutcome::Text("pong".to_string()));
    }
}
