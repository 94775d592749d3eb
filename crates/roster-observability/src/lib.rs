//! Roster Observability
//!
//! Logging, distributed tracing and Prometheus metrics for the API.
//!
//! Everything beyond console logging sits behind the `observability` feature.
//! At runtime it can be switched off again with `OBSERVABILITY_ENABLED=false`,
//! in which case the process logs to the console only and metric helpers are
//! no-ops.
//!
//! # Examples
//!
//! ```no_run
//! use roster_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     // ... application code ...
//!     shutdown_tracer().await;
//! }
//! ```

pub mod basic_logging;
mod enabled;

#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;
#[cfg(feature = "observability")]
pub mod tracing_utils;

pub use basic_logging::init_basic_console_logging;
pub use enabled::is_observability_enabled;

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, shutdown_tracer};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_app, record_error, record_panic, record_request, request_finished,
    request_started, set_alive_tasks, track_token_issued, track_user_created,
    track_user_login_failure, track_user_login_success,
};
#[cfg(feature = "observability")]
pub use tracing_utils::current_trace_id;

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use std::time::Duration;

    use axum::Router;

    /// Placeholder for the Prometheus handle.
    #[derive(Clone)]
    pub struct PrometheusHandle;

    /// Console logging only.
    pub fn init_tracing() {
        crate::basic_logging::init_basic_console_logging();
    }

    pub async fn shutdown_tracer() {}

    pub fn init_metrics() -> Option<PrometheusHandle> {
        None
    }

    pub fn metrics_app(_handle: PrometheusHandle) -> Router {
        Router::new()
    }

    pub fn current_trace_id(_span: &tracing::Span) -> Option<String> {
        None
    }

    pub fn request_started() {}
    pub fn request_finished() {}
    pub fn record_request(_method: &str, _path: &str, _status: u16, _latency: Duration) {}
    pub fn record_error(_method: &str, _path: &str, _status: u16) {}
    pub fn record_panic(_path: &str) {}
    pub fn set_alive_tasks(_count: usize) {}
    pub fn track_user_created(_roles: &str) {}
    pub fn track_user_login_success(_roles: &str) {}
    pub fn track_user_login_failure(_reason: &str) {}
    pub fn track_token_issued(_kid: &str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
