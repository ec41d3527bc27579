use opentelemetry::trace::Status;
use std::{fmt::Display, future::Future};
use tracing::info_span;
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Wrap a text-generation call in a `gen_ai` span, recording the error on
/// the span when the call fails. Observability only: the result passes
/// through untouched.
pub(crate) async fn trace_generation<T, E, Fut>(
    operation: &'static str,
    provider: &'static str,
    model_id: String,
    future: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>> + Send,
    E: Display,
{
    let span = info_span!("draftforge.generate");
    span.set_attribute("gen_ai.operation.name", operation);
    span.set_attribute("gen_ai.provider.name", provider.to_string());
    span.set_attribute("gen_ai.request.model", model_id);

    let result = future.instrument(span.clone()).await;
    if let Err(err) = &result {
        span.set_attribute("exception.message", err.to_string());
        span.set_status(Status::error(err.to_string()));
    }
    result
}
