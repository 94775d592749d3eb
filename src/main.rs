use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;
use roster::modules::users::{PgUserStore, UserBus};
use roster::router::init_router;
use roster::state::AppState;
use roster_auth::{Auth, KeyStore};
use roster_config::{AuthConfig, CorsConfig, DatabaseConfig, WebConfig};
use roster_observability::{init_metrics, init_tracing, metrics_app, shutdown_tracer};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let result = run().await;
    if let Err(err) = &result {
        error!(error = ?err, "server stopped with error");
    }

    shutdown_tracer().await;
    result
}

async fn run() -> anyhow::Result<()> {
    let auth_config = AuthConfig::from_env();
    let web_config = WebConfig::from_env();
    let cors_config = CorsConfig::from_env();
    let db_config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;

    info!(build = %web_config.build, "starting roster api");

    let keys = KeyStore::new();
    keys.load(&auth_config.keys_dir)
        .context("load signing keys")?;
    let active = match &auth_config.active_kid {
        Some(kid) => kid.clone(),
        None => keys.kids().into_iter().next().ok_or_else(|| {
            anyhow!("no keys found in {}", auth_config.keys_dir.display())
        })?,
    };
    keys.set_active(&active)?;
    info!(kid = %active, "active signing key");
    let auth = Arc::new(Auth::new(Arc::new(keys)));

    let db = roster_db::init_db_pool(&db_config)
        .await
        .context("connect to database")?;
    let bus = UserBus::new(Arc::new(PgUserStore::new(db.clone())));

    let api_host = web_config.api_host.clone();
    let debug_host = web_config.debug_host.clone();
    let shutdown_timeout = web_config.shutdown_timeout;

    let state = AppState::new(db.clone(), auth, bus, auth_config, web_config, cors_config);
    let app = init_router(state);

    let shutdown = CancellationToken::new();

    if let Some(handle) = init_metrics() {
        let listener = TcpListener::bind(&debug_host)
            .await
            .with_context(|| format!("bind debug host {debug_host}"))?;
        info!(addr = %debug_host, "metrics listening");

        let token = shutdown.clone();
        tokio::spawn(async move {
            let served = axum::serve(listener, metrics_app(handle))
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "metrics server failed");
            }
        });
    }

    let listener = TcpListener::bind(&api_host)
        .await
        .with_context(|| format!("bind api host {api_host}"))?;
    info!(addr = %api_host, "api listening");

    let token = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
    });

    tokio::select! {
        joined = &mut server => {
            shutdown.cancel();
            return joined.context("api server task")?.context("api server");
        }
        _ = shutdown_signal() => {}
    }

    info!(timeout = ?shutdown_timeout, "shutdown started");
    shutdown.cancel();

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(joined) => joined.context("api server task")?.context("api server")?,
        Err(_) => warn!("graceful shutdown timed out, dropping open connections"),
    }

    db.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "listening for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "listening for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
