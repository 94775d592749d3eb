use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// The OpenTelemetry trace id for `span`, as lowercase hex.
///
/// `None` when the span is disabled or no OpenTelemetry layer is installed.
pub fn current_trace_id(span: &Span) -> Option<String> {
    let context = span.context();
    let span_context = context.span().span_context().clone();

    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}
