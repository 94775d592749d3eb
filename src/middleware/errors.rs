use roster_web::{Ctx, Middleware, Next, Request, respond_error};
use tracing::{error, warn};

/// Renders handler errors into responses.
///
/// This is the only place an `AppError` becomes a response. Server errors are
/// logged in full while the client sees a generic message.
pub fn errors() -> Middleware {
    Middleware::from_fn(|ctx: Ctx, req: Request, next: Next| async move {
        match next.run(ctx.clone(), req).await {
            Ok(response) => Ok(response),
            Err(err) => {
                let meta = ctx.meta();
                let location = err.location();

                if err.is_server_error() {
                    error!(
                        request_id = %meta.request_id(),
                        trace_id = meta.trace_id().unwrap_or_default(),
                        file = location.file(),
                        line = location.line(),
                        status = err.status.as_u16(),
                        error = %format!("{:#}", err.error),
                        "request failed"
                    );
                } else {
                    warn!(
                        request_id = %meta.request_id(),
                        trace_id = meta.trace_id().unwrap_or_default(),
                        file = location.file(),
                        line = location.line(),
                        status = err.status.as_u16(),
                        error = %err.error,
                        "request rejected"
                    );
                }

                Ok(respond_error(meta, err))
            }
        }
    })
}
