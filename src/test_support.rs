//! Shared helpers for span assertions in unit tests

use opentelemetry::global;
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use std::sync::OnceLock;

/// Serializes tests that install into the process-wide transport slot.
pub static GLOBAL_SLOT: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

static EXPORTER: OnceLock<InMemorySpanExporter> = OnceLock::new();

/// In-memory exporter registered as the global tracer provider. Call before
/// creating an interceptor so it picks up the recording tracer.
pub fn span_exporter() -> &'static InMemorySpanExporter {
    EXPORTER.get_or_init(|| {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let _ = global::set_tracer_provider(provider);
        exporter
    })
}

pub fn attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

/// Finished spans whose `http.url` is `url`. Tests use distinct URLs so
/// they can share the exporter.
pub fn finished_spans_for(exporter: &InMemorySpanExporter, url: &str) -> Vec<SpanData> {
    exporter
        .get_finished_spans()
        .expect("in-memory exporter is readable")
        .into_iter()
        .filter(|span| attribute(span, "http.url").as_deref() == Some(url))
        .collect()
}

pub fn finished_span(exporter: &InMemorySpanExporter, url: &str) -> SpanData {
    let mut spans = finished_spans_for(exporter, url);
    assert_eq!(spans.len(), 1, "expected exactly one span for {url}");
    spans.remove(0)
}
