use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{RawPathParams, Request};
use axum::http::Method;
use axum::response::Response;
use axum::routing::{MethodFilter, on};
use roster_core::AppError;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::ctx::{Ctx, context_error};
use crate::handler::{BoxHandler, Handler};
use crate::meta::RequestMeta;
use crate::middleware::{Middleware, wrap_all};
use crate::respond::respond_error;

/// Routes `(method, /version/path)` to handlers wrapped in middleware.
///
/// Every handler registered with [`Mux::handle`] runs inside the global
/// middlewares, outermost first, and then its own route middlewares:
///
/// ```text
/// global[0] -> ... -> global[n] -> route[0] -> ... -> route[m] -> handler
/// ```
///
/// Everything inside the global chain is raced against the request's
/// cancellation and deadline. When either fires first the route chain is
/// dropped and the global chain sees the error from [`context_error`].
pub struct Mux {
    router: Router,
    global: Vec<Middleware>,
    request_timeout: Option<Duration>,
}

impl Mux {
    pub fn new(global: Vec<Middleware>) -> Self {
        Self {
            router: Router::new(),
            global,
            request_timeout: None,
        }
    }

    /// Deadline applied to each request's context.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Registers `handler` at `/{version}{path}` behind the global
    /// middlewares and then `mids`.
    ///
    /// # Panics
    ///
    /// When the method is not routable or the route is already registered.
    pub fn handle<H: Handler>(
        &mut self,
        method: Method,
        version: &str,
        path: &str,
        handler: H,
        mids: &[Middleware],
    ) {
        let handler = bounded(wrap_all(mids, Arc::new(handler)));
        let handler = wrap_all(&self.global, handler);
        self.register(method, route_path(version, path), handler);
    }

    /// Registers `handler` behind `mids` only, skipping the global chain.
    /// Used for probes that must answer even when logging or metrics back
    /// up.
    pub fn handle_probe<H: Handler>(
        &mut self,
        method: Method,
        version: &str,
        path: &str,
        handler: H,
        mids: &[Middleware],
    ) {
        let handler = wrap_all(mids, bounded(Arc::new(handler)));
        self.register(method, route_path(version, path), handler);
    }

    fn register(&mut self, method: Method, path: String, handler: BoxHandler) {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => panic!("unroutable method {method} for {path}"),
        };
        let timeout = self.request_timeout;
        let route: Arc<str> = Arc::from(path.as_str());

        let endpoint = move |params: Result<RawPathParams, RawPathParamsRejection>, req: Request| {
            let handler = handler.clone();
            let route = route.clone();
            async move { dispatch(handler, route, timeout, params, req).await }
        };

        let router = std::mem::take(&mut self.router);
        self.router = router.route(&path, on(filter, endpoint));
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Stops waiting on `handler` once the request is cancelled or its deadline
/// passes.
fn bounded(handler: BoxHandler) -> BoxHandler {
    Arc::new(move |ctx: Ctx, req: Request| {
        let handler = handler.clone();
        async move {
            let fut = handler.call(ctx.clone(), req);
            match ctx.run(fut).await {
                Ok(result) => result,
                Err(reason) => Err(context_error(reason)),
            }
        }
    })
}

fn route_path(version: &str, path: &str) -> String {
    let version = version.trim_matches('/');
    if version.is_empty() {
        path.to_string()
    } else {
        format!("/{version}{path}")
    }
}

async fn dispatch(
    handler: BoxHandler,
    route: Arc<str>,
    timeout: Option<Duration>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    req: Request,
) -> Response {
    let meta = Arc::new(RequestMeta::new(&req, route.as_ref()));

    // Dropping this future (client gone) cancels the context.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let params = params
        .map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let mut ctx = Ctx::new(meta.clone(), cancel).with_params(params);
    if let Some(timeout) = timeout {
        ctx = ctx.with_timeout(timeout);
    }

    match handler.call(ctx, req).await {
        Ok(response) => response,
        Err(err) => fallback(&meta, err),
    }
}

/// Renders an error no middleware handled.
fn fallback(meta: &RequestMeta, err: AppError) -> Response {
    error!(
        request_id = %meta.request_id(),
        method = %meta.method(),
        path = %meta.route(),
        error = %err,
        "unhandled error"
    );
    respond_error(meta, err)
}
