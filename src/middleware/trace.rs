use roster_observability::current_trace_id;
use roster_web::{Ctx, Middleware, Next, Request};
use tracing::{Instrument, field, info_span};

/// Opens the `http.request` span around the rest of the chain and records
/// its trace id on the request metadata.
pub fn trace() -> Middleware {
    Middleware::from_fn(|ctx: Ctx, req: Request, next: Next| async move {
        let meta = ctx.meta();
        let span = info_span!(
            "http.request",
            http.method = %meta.method(),
            http.route = %meta.route(),
            http.status_code = field::Empty,
            request_id = %meta.request_id(),
        );

        if let Some(trace_id) = current_trace_id(&span) {
            meta.set_trace_id(trace_id);
        }

        let result = next.run(ctx.clone(), req).instrument(span.clone()).await;

        if let Some(status) = ctx.meta().status() {
            span.record("http.status_code", status.as_u16());
        }

        result
    })
}
