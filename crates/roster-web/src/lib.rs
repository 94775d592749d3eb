//! Request-scoped plumbing for the API.
//!
//! Handlers here are not axum handlers. They take a [`Ctx`] and the raw
//! request and return `Result<Response, AppError>`, so middlewares see typed
//! errors instead of already-rendered responses. [`Mux`] adapts them onto an
//! axum [`Router`](axum::Router).

pub mod ctx;
pub mod handler;
pub mod meta;
pub mod middleware;
pub mod mux;
pub mod respond;

pub use ctx::{ContextError, Ctx, context_error};
pub use handler::{BoxHandler, Handler, HandlerFuture, with_state};
pub use meta::RequestMeta;
pub use middleware::{Middleware, Next, wrap_all};
pub use mux::Mux;
pub use respond::{no_content, respond, respond_error};

pub use axum::extract::Request;
pub use axum::response::Response;
