use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use roster_core::AppError;

use crate::ctx::Ctx;
use crate::handler::BoxHandler;

/// Wraps a handler into another handler.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(BoxHandler) -> BoxHandler + Send + Sync>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Builds a middleware from an async function that receives the rest of
    /// the chain as [`Next`].
    ///
    /// ```ignore
    /// let mid = Middleware::from_fn(|ctx, req, next: Next| async move {
    ///     tracing::debug!("before");
    ///     let res = next.run(ctx, req).await;
    ///     tracing::debug!("after");
    ///     res
    /// });
    /// ```
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Ctx, Request, Next) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
    {
        Self::new(move |inner: BoxHandler| {
            let f = f.clone();
            let handler = move |ctx: Ctx, req: Request| {
                f(
                    ctx,
                    req,
                    Next {
                        inner: inner.clone(),
                    },
                )
            };
            Arc::new(handler) as BoxHandler
        })
    }

    pub fn wrap(&self, handler: BoxHandler) -> BoxHandler {
        (self.0)(handler)
    }
}

/// Wraps `handler` so that `mids[0]` runs first and `mids[n-1]` runs last,
/// directly before the handler.
pub fn wrap_all(mids: &[Middleware], handler: BoxHandler) -> BoxHandler {
    mids.iter().rev().fold(handler, |h, mid| mid.wrap(h))
}

/// The remainder of the chain.
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    /// Runs the rest of the chain. Nothing runs until the returned future is
    /// first polled.
    pub async fn run(self, ctx: Ctx, req: Request) -> Result<Response, AppError> {
        self.inner.call(ctx, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::RequestMeta;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use parking_lot::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
        Middleware::from_fn(move |ctx, req, next: Next| {
            let log = log.clone();
            async move {
                log.lock().push(format!("{name}-in"));
                let res = next.run(ctx, req).await;
                log.lock().push(format!("{name}-out"));
                res
            }
        })
    }

    #[tokio::test]
    async fn test_wrap_all_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let handler: BoxHandler = Arc::new(move |_ctx: Ctx, _req: Request| {
            let log = handler_log.clone();
            async move {
                log.lock().push("handler".to_string());
                Ok::<_, AppError>(StatusCode::OK.into_response())
            }
        });

        let chain = wrap_all(
            &[recorder(log.clone(), "a"), recorder(log.clone(), "b")],
            handler,
        );
        let ctx = Ctx::background(Arc::new(RequestMeta::detached()));
        let res = chain
            .call(ctx, Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            *log.lock(),
            vec!["a-in", "b-in", "handler", "b-out", "a-out"]
        );
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let reached = Arc::new(Mutex::new(false));
        let flag = reached.clone();
        let handler: BoxHandler = Arc::new(move |_ctx: Ctx, _req: Request| {
            let flag = flag.clone();
            async move {
                *flag.lock() = true;
                Ok::<_, AppError>(StatusCode::OK.into_response())
            }
        });
        let deny = Middleware::from_fn(|_ctx, _req, _next: Next| async move {
            Err::<Response, _>(AppError::forbidden(anyhow::anyhow!("denied")))
        });

        let chain = wrap_all(&[deny], handler);
        let ctx = Ctx::background(Arc::new(RequestMeta::detached()));
        let err = chain
            .call(ctx, Request::new(Body::empty()))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(!*reached.lock());
    }
}
