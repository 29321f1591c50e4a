//! Per-call capture orchestration
//!
//! [`Interceptor::intercept`] brackets one transport call with one client span:
//! request metadata and body are attached before the call, response metadata
//! and body after it. Capture problems only ever degrade the attributes; the
//! transport result is handed back untouched.

pub mod attributes;
pub mod install;

use futures::future::BoxFuture;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{FutureExt, SpanKind, Status, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use reqwest::Method;
use std::sync::Arc;
use url::Url;

use crate::capture::{capture_request_body, capture_response_body};
use crate::config::InterceptorConfig;
use crate::error::TransportError;
use crate::fetch::{
    resolve_headers, resolve_method, RequestInit, RequestInput, Response, Transport,
};
use crate::redact::redact;

/// Tracer name and the `instrumentation.source` attribute.
pub const INSTRUMENTATION_SOURCE: &str = "fetchscope";
pub const INSTRUMENTATION_NAME: &str = "fetchscope-fetch";
pub const INSTRUMENTATION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle of one intercepted call, used in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Started,
    RequestCaptured,
    TransportInvoked,
    ResponseCaptured,
    Finalized,
    Failed,
}

/// Wraps transport calls in spans carrying redacted headers and bodies.
pub struct Interceptor {
    config: InterceptorConfig,
    tracer: BoxedTracer,
}

impl Interceptor {
    /// Create an interceptor using the globally registered tracer provider.
    pub fn new(config: InterceptorConfig) -> Self {
        let scope = InstrumentationScope::builder(INSTRUMENTATION_SOURCE)
            .with_version(INSTRUMENTATION_VERSION)
            .build();
        let tracer = global::tracer_provider().tracer_with_scope(scope);
        Self { config, tracer }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Bind this interceptor in front of a transport.
    pub fn wrap(self: Arc<Self>, inner: Arc<dyn Transport>) -> InterceptedTransport {
        InterceptedTransport {
            interceptor: self,
            inner,
        }
    }

    /// Run one call through `transport` inside a client span.
    pub async fn intercept(
        &self,
        transport: &dyn Transport,
        input: RequestInput,
        init: RequestInit,
    ) -> Result<Response, TransportError> {
        let url = match input.resolve_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Request URL not resolvable, passing call through");
                return transport.fetch(input, init).await;
            }
        };
        let method = resolve_method(&input, &init);

        let span = self
            .tracer
            .span_builder(format!("fetch {method}"))
            .with_kind(SpanKind::Client)
            .with_attributes(request_attributes(&method, &url))
            .start(&self.tracer);
        let mut guard = SpanGuard::new(Context::current_with_span(span));
        tracing::debug!(phase = ?Phase::Started, method = %method, url = %url, "Intercepting call");

        self.capture_request(guard.context(), &input, &init);
        tracing::debug!(phase = ?Phase::RequestCaptured, "Request captured");

        let result = transport
            .fetch(input, init)
            .with_context(guard.context().clone())
            .await;
        tracing::debug!(phase = ?Phase::TransportInvoked, ok = result.is_ok(), "Transport returned");

        match result {
            Ok(response) => {
                self.capture_response(guard.context(), &response).await;
                tracing::debug!(phase = ?Phase::ResponseCaptured, status = %response.status(), "Response captured");

                guard.finish(Status::Ok);
                tracing::debug!(phase = ?Phase::Finalized, "Span finalized");
                Ok(response)
            }
            Err(e) => {
                guard.finish(Status::error(e.to_string()));
                tracing::debug!(phase = ?Phase::Failed, error = %e, "Transport failed");
                Err(e)
            }
        }
    }

    fn capture_request(&self, cx: &Context, input: &RequestInput, init: &RequestInit) {
        let span = cx.span();
        let headers = resolve_headers(input, init);

        if self.config.capture_headers {
            if let Some(headers) = headers {
                let redaction = redact(
                    headers
                        .iter()
                        .map(|(name, value)| (name.to_lowercase(), value.as_str())),
                );
                span.set_attributes(attributes::header_attributes("request", &redaction));
            }
        }

        if self.config.capture_request_body {
            if let Some(body) = &init.body {
                let outcome = capture_request_body(body, headers, self.config.max_body_size);
                span.set_attribute(attributes::body_attribute(
                    "request.body",
                    &outcome,
                    self.config.max_body_size,
                ));
            }
        }
    }

    async fn capture_response(&self, cx: &Context, response: &Response) {
        cx.span().set_attributes([
            KeyValue::new("http.status_code", i64::from(response.status().as_u16())),
            KeyValue::new("http.status_text", response.status_text().to_string()),
        ]);

        if self.config.capture_headers {
            let redaction = redact(response.headers().iter().map(|(name, value)| {
                (
                    name.as_str().to_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            }));
            cx.span()
                .set_attributes(attributes::header_attributes("response", &redaction));
        }

        if self.config.capture_response_body {
            let outcome = capture_response_body(response.clone(), self.config.max_body_size).await;
            cx.span().set_attribute(attributes::body_attribute(
                "response.body",
                &outcome,
                self.config.max_body_size,
            ));
        }
    }
}

fn request_attributes(method: &Method, url: &Url) -> Vec<KeyValue> {
    vec![
        KeyValue::new("http.method", method.to_string()),
        KeyValue::new("http.url", url.to_string()),
        KeyValue::new("http.scheme", url.scheme().to_string()),
        KeyValue::new("http.host", url.host_str().unwrap_or_default().to_string()),
        KeyValue::new("instrumentation.source", INSTRUMENTATION_SOURCE),
        KeyValue::new("instrumentation.version", INSTRUMENTATION_VERSION),
        KeyValue::new("instrumentation.name", INSTRUMENTATION_NAME),
    ]
}

/// Ends the span exactly once. A call dropped before completion is recorded
/// as cancelled.
struct SpanGuard {
    cx: Context,
    finished: bool,
}

impl SpanGuard {
    fn new(cx: Context) -> Self {
        Self {
            cx,
            finished: false,
        }
    }

    fn context(&self) -> &Context {
        &self.cx
    }

    fn finish(&mut self, status: Status) {
        if self.finished {
            return;
        }
        self.finished = true;
        let span = self.cx.span();
        span.set_status(status);
        span.end();
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.finish(Status::error("request cancelled"));
    }
}

/// A transport whose calls all go through an [`Interceptor`].
#[derive(Clone)]
pub struct InterceptedTransport {
    interceptor: Arc<Interceptor>,
    inner: Arc<dyn Transport>,
}

impl InterceptedTransport {
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }
}

impl Transport for InterceptedTransport {
    fn fetch(
        &self,
        input: RequestInput,
        init: RequestInit,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        let interceptor = Arc::clone(&self.interceptor);
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { interceptor.intercept(inner.as_ref(), input, init).await })
    }
}
