use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};

use crate::docs::ApiDoc;
use crate::middleware;
use crate::modules::{health, users};
use crate::state::AppState;
use roster_web::Mux;

/// Builds the API router: every route on the [`Mux`], the API docs and CORS.
pub fn init_router(state: AppState) -> Router {
    let mut mux = Mux::new(middleware::global())
        .with_request_timeout(state.web_config.request_timeout);

    health::router::routes(&mut mux, &state);
    users::router::routes(&mut mux, &state);

    let origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    mux.into_router()
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route(
            "/api-docs/openapi.json",
            axum::routing::get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true),
        )
}
