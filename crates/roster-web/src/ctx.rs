use std::any::type_name;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Extensions, StatusCode};
use roster_core::AppError;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::meta::RequestMeta;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("{0} not found in request context")]
    Missing(&'static str),
    #[error("{0} already set in request context")]
    AlreadySet(&'static str),
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Maps a context that ended before its work: 503 once the deadline has
/// passed, 500 for cancellation or a misused context value.
#[track_caller]
pub fn context_error(err: ContextError) -> AppError {
    match err {
        ContextError::DeadlineExceeded => AppError::new(StatusCode::SERVICE_UNAVAILABLE, err),
        _ => AppError::internal(err),
    }
}

/// Request context passed down the handler chain.
///
/// Cloning is cheap. Values are typed: each type can be stored once, and
/// [`Ctx::with_value`] returns a new context so outer layers never observe
/// values added further in.
#[derive(Clone)]
pub struct Ctx {
    meta: Arc<RequestMeta>,
    values: Arc<Extensions>,
    params: Arc<Vec<(String, String)>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Ctx {
    pub fn new(meta: Arc<RequestMeta>, cancel: CancellationToken) -> Self {
        Self {
            meta,
            values: Arc::new(Extensions::new()),
            params: Arc::new(Vec::new()),
            cancel,
            deadline: None,
        }
    }

    /// A context that is only cancelled by its deadline.
    pub fn background(meta: Arc<RequestMeta>) -> Self {
        Self::new(meta, CancellationToken::new())
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = Arc::new(params);
        self
    }

    /// Tightens the deadline to at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let mut ctx = self.clone();
        ctx.deadline = Some(match self.deadline {
            Some(current) if current < candidate => current,
            _ => candidate,
        });
        ctx
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Path parameter captured by the route, e.g. `id` in `/users/{id}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn value<T: Send + Sync + 'static>(&self) -> Result<&T, ContextError> {
        self.values
            .get::<T>()
            .ok_or(ContextError::Missing(type_name::<T>()))
    }

    pub fn with_value<T>(&self, value: T) -> Result<Self, ContextError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if self.values.get::<T>().is_some() {
            return Err(ContextError::AlreadySet(type_name::<T>()));
        }

        let mut values = (*self.values).clone();
        values.insert(value);

        let mut ctx = self.clone();
        ctx.values = Arc::new(values);
        Ok(ctx)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the client has gone away or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> ContextError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = self.cancel.cancelled() => ContextError::Cancelled,
            _ = deadline => ContextError::DeadlineExceeded,
        }
    }

    /// Runs `fut` unless the context is done first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        tokio::select! {
            biased;
            reason = self.cancelled() => Err(reason),
            out = fut => Ok(out),
        }
    }
}
