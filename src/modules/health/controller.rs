use std::time::Duration;

use anyhow::anyhow;
use axum::http::StatusCode;
use roster_core::AppError;
use roster_db::conn_check;
use roster_web::{Ctx, Request, Response, respond};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use crate::state::AppState;

const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// What the liveness probe reports about the running instance.
#[derive(Debug, Serialize, ToSchema)]
pub struct Info {
    pub status: String,
    pub build: String,
    pub host: String,
    pub name: String,
    pub pod_ip: String,
    pub node: String,
    pub namespace: String,
    pub cpus: usize,
}

impl Info {
    /// Reads the instance details from the environment. Kubernetes values
    /// are empty outside a cluster.
    pub fn collect(build: &str) -> Self {
        let env = |key: &str| std::env::var(key).unwrap_or_default();

        Self {
            status: "running".to_string(),
            build: build.to_string(),
            host: hostname(),
            name: env("KUBERNETES_NAME"),
            pod_ip: env("KUBERNETES_POD_IP"),
            node: env("KUBERNETES_NODE_NAME"),
            namespace: env("KUBERNETES_NAMESPACE"),
            cpus: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "unavailable".to_string())
}

/// Readiness probe
///
/// Answers 200 once the database accepts queries.
#[utoipa::path(
    get,
    path = "/v1/readiness",
    responses(
        (status = 200, description = "Ready to serve traffic"),
        (status = 500, description = "Database not reachable"),
    ),
    tag = "Health"
)]
pub async fn readiness(state: AppState, ctx: Ctx, _req: Request) -> Result<Response, AppError> {
    let checked = ctx
        .with_timeout(READINESS_TIMEOUT)
        .run(conn_check(&state.db, Some(READINESS_TIMEOUT)))
        .await
        .map_err(|e| anyhow!(e))
        .and_then(|result| result);

    if let Err(err) = checked {
        error!(error = %err, "readiness failed");
        return Err(AppError::internal(err));
    }

    respond(&ctx, StatusCode::OK, &json!({ "status": "ok" }))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/v1/liveness",
    responses((status = 200, description = "Instance details", body = Info)),
    tag = "Health"
)]
pub async fn liveness(state: AppState, ctx: Ctx, _req: Request) -> Result<Response, AppError> {
    respond(&ctx, StatusCode::OK, &Info::collect(&state.web_config.build))
}
