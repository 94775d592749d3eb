mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{request, seed_user, send, test_app, test_app_with, token_for};
use http_body_util::BodyExt;
use roster::middleware::{global, panics};
use roster::modules::users::{MemUserStore, UserError, UserStore};
use roster_config::AuthConfig;
use roster_core::{AppError, INTERNAL_MESSAGE, OrderBy, Page};
use roster_models::{QueryFilter, Role, User, UserOrderField};
use roster_web::{Ctx, Mux, Response, respond};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

/// Delegates to the in-memory store, except that looking a user up by id
/// never completes.
struct StalledLookups {
    inner: Arc<MemUserStore>,
}

#[async_trait]
impl UserStore for StalledLookups {
    async fn create(&self, user: &User) -> Result<(), UserError> {
        self.inner.create(user).await
    }

    async fn update(&self, user: &User) -> Result<(), UserError> {
        self.inner.update(user).await
    }

    async fn delete(&self, user: &User) -> Result<(), UserError> {
        self.inner.delete(user).await
    }

    async fn query(
        &self,
        filter: &QueryFilter,
        order: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> Result<Vec<User>, UserError> {
        self.inner.query(filter, order, page).await
    }

    async fn count(&self, filter: &QueryFilter) -> Result<i64, UserError> {
        self.inner.count(filter).await
    }

    async fn query_by_id(&self, _id: Uuid) -> Result<User, UserError> {
        std::future::pending().await
    }

    async fn query_by_email(&self, email: &str) -> Result<User, UserError> {
        self.inner.query_by_email(email).await
    }
}

async fn call(mux: Mux, uri: &str) -> (StatusCode, Value) {
    let response = mux
        .into_router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_liveness() {
    let app = test_app();

    let (status, body) = send(&app, request(Method::GET, "/v1/liveness", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["build"], "test");
    assert!(body["cpus"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app();

    let (status, body) = send(
        &app,
        request(Method::GET, "/api-docs/openapi.json", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/users"].is_object());
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let mut mux = Mux::new(global());
    mux.handle(
        Method::GET,
        "v1",
        "/boom",
        |_ctx: Ctx, _req: roster_web::Request| async move {
            if true {
                panic!("handler exploded");
            }
            Ok::<Response, AppError>(Response::default())
        },
        &[],
    );

    let (status, body) = call(mux, "/v1/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_MESSAGE);
}

#[tokio::test]
async fn test_panic_in_probe_chain() {
    let mut mux = Mux::new(global());
    mux.handle_probe(
        Method::GET,
        "v1",
        "/boom",
        |_ctx: Ctx, _req: roster_web::Request| async move {
            if true {
                panic!("probe exploded");
            }
            Ok::<Response, AppError>(Response::default())
        },
        &[panics()],
    );

    let (status, body) = call(mux, "/v1/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_MESSAGE);
}

#[tokio::test]
async fn test_client_errors_keep_their_message() {
    let mut mux = Mux::new(global());
    mux.handle(
        Method::GET,
        "v1",
        "/teapot",
        |_ctx: Ctx, _req: roster_web::Request| async move {
            Err::<Response, AppError>(AppError::new(
                StatusCode::IM_A_TEAPOT,
                anyhow!("short and stout"),
            ))
        },
        &[],
    );

    let (status, body) = call(mux, "/v1/teapot").await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body["error"], "short and stout");
}

#[tokio::test]
async fn test_server_errors_hide_their_message() {
    let mut mux = Mux::new(global());
    mux.handle(
        Method::GET,
        "v1",
        "/db",
        |_ctx: Ctx, _req: roster_web::Request| async move {
            Err::<Response, AppError>(AppError::internal(anyhow!("connection reset by peer")))
        },
        &[],
    );

    let (status, body) = call(mux, "/v1/db").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_MESSAGE);
}

#[tokio::test]
async fn test_stalled_user_lookup_times_out() {
    let auth_config = AuthConfig {
        lookup_timeout: Duration::from_millis(50),
        ..AuthConfig::default()
    };
    let app = test_app_with(
        |inner| Arc::new(StalledLookups { inner }) as Arc<dyn UserStore>,
        auth_config,
    );
    let user = seed_user(&app, "Alex Doe", vec![Role::User]).await;
    let token = token_for(&app, &user);

    let started = Instant::now();
    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/v1/users/{}", user.id),
            Some(&token),
            None,
        ),
    )
    .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": INTERNAL_MESSAGE }));
}

#[tokio::test]
async fn test_request_deadline_stops_slow_handler() {
    let finished = Arc::new(AtomicBool::new(false));
    let mut mux = Mux::new(global()).with_request_timeout(Duration::from_millis(50));

    let handler_finished = finished.clone();
    mux.handle(
        Method::GET,
        "v1",
        "/slow",
        move |ctx: Ctx, _req: roster_web::Request| {
            let finished = handler_finished.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                finished.store(true, Ordering::SeqCst);
                respond(&ctx, StatusCode::OK, &json!({ "late": true }))
            }
        },
        &[],
    );

    let started = Instant::now();
    let (status, body) = call(mux, "/v1/slow").await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], INTERNAL_MESSAGE);
    assert!(!finished.load(Ordering::SeqCst));
}
