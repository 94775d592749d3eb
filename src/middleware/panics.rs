use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use anyhow::anyhow;
use futures::FutureExt;
use roster_core::AppError;
use roster_observability::record_panic;
use roster_web::{Ctx, Middleware, Next, Request};

/// Turns a panic anywhere further down the chain into a 500 error carrying
/// the panic message and a backtrace.
pub fn panics() -> Middleware {
    Middleware::from_fn(|ctx: Ctx, req: Request, next: Next| async move {
        let route = ctx.meta().route().to_string();

        match AssertUnwindSafe(next.run(ctx, req)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let trace = Backtrace::force_capture();
                record_panic(&route);
                Err(AppError::internal(anyhow!(
                    "PANIC[{}] TRACE[{}]",
                    panic_message(payload.as_ref()),
                    trace
                )))
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use roster_web::{BoxHandler, RequestMeta, Response, wrap_all};
    use std::sync::Arc;

    fn ctx() -> Ctx {
        Ctx::background(Arc::new(RequestMeta::detached()))
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let handler: BoxHandler = Arc::new(|_ctx: Ctx, _req: Request| async move {
            if true {
                panic!("boom");
            }
            Ok::<Response, AppError>(StatusCode::OK.into_response())
        });

        let err = wrap_all(&[panics()], handler)
            .call(ctx(), Request::new(Body::empty()))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = err.error.to_string();
        assert!(message.starts_with("PANIC[boom] TRACE["));
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let handler: BoxHandler = Arc::new(|_ctx: Ctx, _req: Request| async move {
            let id = 7;
            if id > 0 {
                panic!("user {id} vanished");
            }
            Ok::<Response, AppError>(StatusCode::OK.into_response())
        });

        let err = wrap_all(&[panics()], handler)
            .call(ctx(), Request::new(Body::empty()))
            .await
            .unwrap_err();
        assert!(err.error.to_string().contains("PANIC[user 7 vanished]"));
    }

    #[tokio::test]
    async fn test_no_panic_passes_through() {
        let handler: BoxHandler = Arc::new(|_ctx: Ctx, _req: Request| async move {
            Ok::<Response, AppError>(StatusCode::ACCEPTED.into_response())
        });

        let res = wrap_all(&[panics()], handler)
            .call(ctx(), Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }
}
