//! Span export to the application log

use futures::future::BoxFuture;
use opentelemetry::global;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::trace::TracerProvider;
use std::collections::BTreeMap;

/// Writes every finished span to the `tracing` log at info level.
#[derive(Debug, Default)]
pub struct LogSpanExporter;

impl SpanExporter for LogSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        for span in batch {
            let attributes: BTreeMap<String, String> = span
                .attributes
                .iter()
                .map(|kv| (kv.key.as_str().to_string(), kv.value.as_str().into_owned()))
                .collect();
            tracing::info!(
                span = %span.name,
                status = ?span.status,
                attributes = ?attributes,
                "Span finished"
            );
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Register a tracer provider that exports through [`LogSpanExporter`] as the
/// global provider. Keep the returned provider to shut it down on exit.
pub fn init_tracer_provider() -> TracerProvider {
    let provider = TracerProvider::builder()
        .with_simple_exporter(LogSpanExporter)
        .build();
    let _ = global::set_tracer_provider(provider.clone());
    provider
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_empty_batch() {
        let mut exporter = LogSpanExporter;
        let result = futures::executor::block_on(exporter.export(Vec::new()));
        assert!(result.is_ok());
    }
}
