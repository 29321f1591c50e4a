//! Sensitive header redaction

pub mod token;

use std::collections::BTreeMap;

/// Value written over every sensitive header
pub const REDACTED: &str = "[REDACTED]";

/// Header name fragments that mark a header as sensitive. Matched as
/// substrings of the lowercased name.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
    "x-kubiks-key",
    "bearer",
    "proxy-authorization",
    "www-authenticate",
    "proxy-authenticate",
];

/// Headers after redaction, plus any claims lifted from authorization tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redaction {
    /// Same keys as the input, original casing. Repeated names are joined
    /// with `", "`.
    pub headers: BTreeMap<String, String>,
    /// `token.<claim>` to stringified claim value.
    pub claims: BTreeMap<String, String>,
}

/// Returns true if the header name contains any denylisted fragment.
pub fn is_sensitive(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_HEADERS.iter().any(|s| lower.contains(s))
}

/// Redact sensitive header values.
///
/// Authorization-family headers are decoded for token claims before their
/// value is replaced; the value is replaced whether or not decoding works.
pub fn redact<I, K, V>(headers: I) -> Redaction
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut redaction = Redaction::default();

    for (name, value) in headers {
        let name = name.as_ref();
        let value = value.as_ref();

        if !is_sensitive(name) {
            redaction
                .headers
                .entry(name.to_string())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(value);
                })
                .or_insert_with(|| value.to_string());
            continue;
        }

        if name.to_lowercase().contains("authorization") && !value.is_empty() {
            if let Some(claims) = token::parse_claims(value) {
                redaction.claims.extend(token::scalar_claims(&claims));
            }
        }
        redaction.headers.insert(name.to_string(), REDACTED.to_string());
    }

    redaction
}
