use roster_web::{Ctx, Middleware, Next, Request};
use tracing::{error, info, warn};

/// Logs a line when the request arrives and another once the rest of the
/// chain has finished, at a level that follows the final status.
pub fn logger() -> Middleware {
    Middleware::from_fn(|ctx: Ctx, req: Request, next: Next| async move {
        let path = req
            .uri()
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let remote_addr = ctx
            .meta()
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();

        {
            let meta = ctx.meta();
            info!(
                request_id = %meta.request_id(),
                trace_id = meta.trace_id().unwrap_or_default(),
                method = %meta.method(),
                path = %path,
                remote_addr = %remote_addr,
                "request started"
            );
        }

        let result = next.run(ctx.clone(), req).await;

        let meta = ctx.meta();
        let status = meta
            .status()
            .or_else(|| result.as_ref().ok().map(|res| res.status()))
            .map(|s| s.as_u16())
            .unwrap_or_default();
        let latency_ms = meta.elapsed().as_millis();

        match status {
            400..=499 => warn!(
                request_id = %meta.request_id(),
                trace_id = meta.trace_id().unwrap_or_default(),
                method = %meta.method(),
                path = %path,
                remote_addr = %remote_addr,
                status,
                latency_ms = %latency_ms,
                "request completed"
            ),
            500..=599 => error!(
                request_id = %meta.request_id(),
                trace_id = meta.trace_id().unwrap_or_default(),
                method = %meta.method(),
                path = %path,
                remote_addr = %remote_addr,
                status,
                latency_ms = %latency_ms,
                "request completed"
            ),
            _ => info!(
                request_id = %meta.request_id(),
                trace_id = meta.trace_id().unwrap_or_default(),
                method = %meta.method(),
                path = %path,
                remote_addr = %remote_addr,
                status,
                latency_ms = %latency_ms,
                "request completed"
            ),
        }

        result
    })
}
