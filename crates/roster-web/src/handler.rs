use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use roster_core::AppError;

use crate::ctx::Ctx;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// A request handler. Implemented for any
/// `Fn(Ctx, Request) -> impl Future<Output = Result<Response, AppError>>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Ctx, req: Request) -> HandlerFuture;
}

pub type BoxHandler = Arc<dyn Handler>;

impl<F, Fut> Handler for F
where
    F: Fn(Ctx, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    fn call(&self, ctx: Ctx, req: Request) -> HandlerFuture {
        Box::pin(self(ctx, req))
    }
}

/// Binds shared state to a handler function.
///
/// ```ignore
/// async fn get_user(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> { .. }
///
/// mux.handle(Method::GET, "v1", "/users/{id}", with_state(state.clone(), get_user), &[]);
/// ```
pub fn with_state<S, F, Fut>(state: S, f: F) -> impl Handler
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S, Ctx, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    move |ctx: Ctx, req: Request| f(state.clone(), ctx, req)
}
