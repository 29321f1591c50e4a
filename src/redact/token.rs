//! Claim extraction from compact three-part bearer tokens
//!
//! Only the payload segment is decoded. Signatures and expiry are never
//! checked, the claims are observability data and nothing else.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Pattern to match a leading `Bearer ` scheme, any casing
static BEARER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^bearer\s+").expect("Invalid regex pattern"));

/// Decode the payload of a `header.payload.signature` token into its claims.
///
/// Returns `None` when the token is not three segments, the payload is not
/// valid base64url, not UTF-8, or not a JSON object.
pub fn parse_claims(token: &str) -> Option<Map<String, Value>> {
    let token = BEARER_PREFIX.replace(token, "");
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let mut payload: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while payload.len() % 4 != 0 {
        payload.push('=');
    }

    let bytes = STANDARD.decode(payload.as_bytes()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    match serde_json::from_str(&text).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Stringify the scalar claims of a token, keyed `token.<claim>`. Objects,
/// arrays and nulls are dropped.
pub fn scalar_claims(claims: &Map<String, Value>) -> Vec<(String, String)> {
    claims
        .iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((format!("token.{name}"), value))
        })
        .collect()
}
