use std::time::Duration;

use axum::{Router, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::error;

use crate::is_observability_enabled;

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()
}

/// Installs the Prometheus recorder and spawns its upkeep task.
///
/// Returns `None` if observability is disabled or the recorder cannot be
/// installed (for example because one already is).
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = match install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to install Prometheus recorder");
            return None;
        }
    };

    // Spawn upkeep task to drain histograms
    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

/// Router for the debug listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// HTTP metrics

pub fn request_started() {
    if !is_observability_enabled() {
        return;
    }
    gauge!("http_requests_active").increment(1.0);
}

pub fn request_finished() {
    if !is_observability_enabled() {
        return;
    }
    gauge!("http_requests_active").decrement(1.0);
}

pub fn record_request(method: &str, path: &str, status: u16, latency: Duration) {
    if !is_observability_enabled() {
        return;
    }
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency.as_secs_f64());
}

pub fn record_error(method: &str, path: &str, status: u16) {
    if !is_observability_enabled() {
        return;
    }
    counter!(
        "http_errors_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_panic(path: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("http_panics_total", "path" => path.to_string()).increment(1);
}

/// Number of live tokio tasks, sampled by the metrics middleware.
pub fn set_alive_tasks(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    gauge!("runtime_alive_tasks").set(count as f64);
}

// Business metrics

pub fn track_user_created(roles: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_created_total", "roles" => roles.to_string()).increment(1);
}

pub fn track_user_login_success(roles: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "roles" => roles.to_string(), "status" => "success").increment(1);
}

pub fn track_user_login_failure(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "failure", "reason" => reason.to_string())
        .increment(1);
}

pub fn track_token_issued(kid: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("jwt_tokens_issued_total", "kid" => kid.to_string()).increment(1);
}
