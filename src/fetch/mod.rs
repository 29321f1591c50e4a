//! Request and response types exchanged with the transport

mod transport;

pub use transport::{ReqwestTransport, Transport};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use url::Url;

use crate::error::TransportError;
use crate::redact;

/// A request-like value that already carries its own URL, method and headers.
#[derive(Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: Vec::new(),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let value = if redact::is_sensitive(name) {
                    redact::REDACTED
                } else {
                    value.as_str()
                };
                (name.as_str(), value)
            })
            .collect();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .finish()
    }
}

/// The first argument of a fetch call.
#[derive(Debug, Clone)]
pub enum RequestInput {
    Url(String),
    Parsed(Url),
    Request(Request),
}

impl RequestInput {
    /// Normalize every input shape to an absolute URL.
    pub fn resolve_url(&self) -> Result<Url, TransportError> {
        match self {
            RequestInput::Url(s) => {
                Url::parse(s).map_err(|e| TransportError::InvalidUrl(format!("{s}: {e}")))
            }
            RequestInput::Parsed(url) => Ok(url.clone()),
            RequestInput::Request(request) => Ok(request.url.clone()),
        }
    }

    fn request(&self) -> Option<&Request> {
        match self {
            RequestInput::Request(request) => Some(request),
            _ => None,
        }
    }
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<Url> for RequestInput {
    fn from(url: Url) -> Self {
        RequestInput::Parsed(url)
    }
}

impl From<Request> for RequestInput {
    fn from(request: Request) -> Self {
        RequestInput::Request(request)
    }
}

/// The shapes a request body can take. Each shape has its own capture rule.
pub enum RequestBody {
    /// Multipart form data, typically file uploads.
    Multipart(reqwest::multipart::Form),
    /// `application/x-www-form-urlencoded` pairs.
    UrlEncoded(Vec<(String, String)>),
    /// A live stream. Never read by the capture layer.
    Stream(reqwest::Body),
    Bytes(Bytes),
    Text(String),
    /// Any other structured value, sent as JSON.
    Json(serde_json::Value),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Multipart(form) => f
                .debug_tuple("Multipart")
                .field(&form.boundary())
                .finish(),
            RequestBody::UrlEncoded(pairs) => f.debug_tuple("UrlEncoded").field(pairs).finish(),
            RequestBody::Stream(_) => f.write_str("Stream"),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Optional per-call settings: method, headers and body.
#[derive(Debug, Default)]
pub struct RequestInit {
    pub method: Option<Method>,
    /// Header names keep the casing the caller used.
    pub headers: Option<Vec<(String, String)>>,
    pub body: Option<RequestBody>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Method for a call: explicit init, then the request-like input, then GET.
pub fn resolve_method(input: &RequestInput, init: &RequestInit) -> Method {
    init.method
        .clone()
        .or_else(|| input.request().map(|r| r.method.clone()))
        .unwrap_or(Method::GET)
}

/// Headers for a call: explicit init headers, else the request-like input's.
pub fn resolve_headers<'a>(
    input: &'a RequestInput,
    init: &'a RequestInit,
) -> Option<&'a [(String, String)]> {
    init.headers
        .as_deref()
        .or_else(|| input.request().map(|r| r.headers.as_slice()))
        .filter(|headers| !headers.is_empty())
}

enum BodySource {
    Buffered(Bytes),
    Upstream(reqwest::Response),
}

/// Body shared between every clone of a response. Filled on first read.
struct SharedBody {
    source: Mutex<Option<BodySource>>,
    buffered: OnceCell<Result<Bytes, String>>,
}

impl SharedBody {
    fn new(source: BodySource) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            buffered: OnceCell::new(),
        }
    }

    async fn bytes(&self) -> Result<Bytes, TransportError> {
        let result = self
            .buffered
            .get_or_init(|| async {
                let source = self
                    .source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                match source {
                    Some(BodySource::Buffered(bytes)) => Ok(bytes),
                    Some(BodySource::Upstream(response)) => {
                        response.bytes().await.map_err(|e| e.to_string())
                    }
                    None => Err("body source already taken".to_string()),
                }
            })
            .await;

        result.clone().map_err(TransportError::Body)
    }
}

/// A response whose clones can each read the full body independently.
#[derive(Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Option<Url>,
    body: Arc<SharedBody>,
}

impl Response {
    /// Build a response around an already buffered body.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            url: None,
            body: Arc::new(SharedBody::new(BodySource::Buffered(body.into()))),
        }
    }

    /// Wrap a reqwest response. The body stays unread until a handle asks for it.
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: Some(response.url().clone()),
            body: Arc::new(SharedBody::new(BodySource::Upstream(response))),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> &str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        self.body.bytes().await
    }

    /// Read the body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.body.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_for_each_input_shape() {
        let url = Url::parse("https://api.example/x").unwrap();

        let from_str = RequestInput::from("https://api.example/x");
        let from_url = RequestInput::from(url.clone());
        let from_request = RequestInput::from(Request::new(Method::POST, url.clone()));

        assert_eq!(from_str.resolve_url().unwrap(), url);
        assert_eq!(from_url.resolve_url().unwrap(), url);
        assert_eq!(from_request.resolve_url().unwrap(), url);
    }

    #[test]
    fn test_resolve_url_rejects_relative() {
        let result = RequestInput::from("/relative/path").resolve_url();
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_method_precedence() {
        let url = Url::parse("https://api.example/x").unwrap();
        let request = RequestInput::from(Request::new(Method::PUT, url));

        assert_eq!(
            resolve_method(&RequestInput::from("https://a.example"), &RequestInit::new()),
            Method::GET
        );
        assert_eq!(resolve_method(&request, &RequestInit::new()), Method::PUT);
        assert_eq!(
            resolve_method(&request, &RequestInit::new().method(Method::DELETE)),
            Method::DELETE
        );
    }

    #[test]
    fn test_resolve_headers_prefers_init() {
        let url = Url::parse("https://api.example/x").unwrap();
        let mut request = Request::new(Method::GET, url);
        request.headers.push(("X-From".to_string(), "request".to_string()));
        let input = RequestInput::from(request);

        let empty = RequestInit::new();
        let from_request = resolve_headers(&input, &empty).unwrap();
        assert_eq!(from_request[0].1, "request");

        let init = RequestInit::new().header("X-From", "init");
        let from_init = resolve_headers(&input, &init).unwrap();
        assert_eq!(from_init[0].1, "init");

        let plain = RequestInput::from("https://api.example/x");
        assert!(resolve_headers(&plain, &empty).is_none());
    }

    #[test]
    fn test_request_debug_hides_sensitive_headers() {
        let url = Url::parse("https://api.example/x").unwrap();
        let mut request = Request::new(Method::POST, url);
        request
            .headers
            .push(("Authorization".to_string(), "Bearer sk-live-SECRET".to_string()));
        request
            .headers
            .push(("Accept".to_string(), "application/json".to_string()));

        let debug = format!("{:?}", RequestInput::from(request));
        assert!(!debug.contains("sk-live-SECRET"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("application/json"));
    }

    #[tokio::test]
    async fn test_cloned_response_reads_are_independent() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "hello");
        let duplicate = response.clone();

        assert_eq!(duplicate.text().await.unwrap(), "hello");
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    #[test]
    fn test_status_text() {
        let response = Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), "");
        assert_eq!(response.status_text(), "Not Found");
    }
}
