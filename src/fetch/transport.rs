//! The transport seam and its reqwest implementation

use futures::future::BoxFuture;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};

use super::{resolve_headers, resolve_method, RequestBody, RequestInit, RequestInput, Response};
use crate::error::TransportError;

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    fn fetch(
        &self,
        input: RequestInput,
        init: RequestInit,
    ) -> BoxFuture<'static, Result<Response, TransportError>>;
}

/// Sends requests over the network with a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(
        &self,
        input: &RequestInput,
        init: RequestInit,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = input.resolve_url()?;
        let method = resolve_method(input, &init);
        let mut req_builder = self.client.request(method, url);

        let mut has_content_type = false;
        if let Some(headers) = resolve_headers(input, &init) {
            for (name, value) in headers {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
                let header_value = HeaderValue::from_str(value)
                    .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
                has_content_type |= header_name == CONTENT_TYPE;
                req_builder = req_builder.header(header_name, header_value);
            }
        }

        req_builder = match init.body {
            None => req_builder,
            Some(RequestBody::Multipart(form)) => req_builder.multipart(form),
            Some(RequestBody::UrlEncoded(pairs)) => req_builder.form(&pairs),
            Some(RequestBody::Stream(body)) => req_builder.body(body),
            Some(RequestBody::Bytes(bytes)) => req_builder.body(bytes),
            Some(RequestBody::Text(text)) => req_builder.body(text),
            Some(RequestBody::Json(value)) => {
                let encoded = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::UpstreamRequest(e.to_string()))?;
                if !has_content_type {
                    req_builder = req_builder.header(CONTENT_TYPE, "application/json");
                }
                req_builder.body(encoded)
            }
        };

        Ok(req_builder)
    }
}

impl Transport for ReqwestTransport {
    fn fetch(
        &self,
        input: RequestInput,
        init: RequestInit,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        let req_builder = self.build(&input, init);

        Box::pin(async move {
            let req_builder = req_builder?;
            tracing::debug!(input = ?input, "Sending request");

            let response = req_builder
                .send()
                .await
                .map_err(|e| TransportError::UpstreamRequest(e.to_string()))?;

            Ok(Response::from_reqwest(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn test_build_rejects_invalid_header() {
        let transport = ReqwestTransport::default();
        let init = RequestInit::new().header("bad header", "value");
        let result = transport.build(&RequestInput::from("https://api.example/x"), init);
        assert!(matches!(result, Err(TransportError::InvalidHeader(_))));
    }

    #[test]
    fn test_build_json_body_sets_content_type() {
        let transport = ReqwestTransport::default();
        let init = RequestInit::new()
            .method(Method::POST)
            .body(serde_json::json!({"q": 1}));
        let request = transport
            .build(&RequestInput::from("https://api.example/x"), init)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().and_then(|b| b.as_bytes()), Some(&b"{\"q\":1}"[..]));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_fails() {
        let transport = ReqwestTransport::default();
        let result = transport
            .fetch(RequestInput::from("not a url"), RequestInit::new())
            .await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }
}
