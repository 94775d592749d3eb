use anyhow::anyhow;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roster_core::AppError;
use serde::Serialize;

use crate::ctx::Ctx;
use crate::meta::RequestMeta;

/// Serializes `data` as JSON with `status` and records the status on the
/// request metadata.
///
/// Fails when the request has already been cancelled, since nobody is left to
/// read the response. `204 No Content` is sent without a body.
pub fn respond<T: Serialize>(ctx: &Ctx, status: StatusCode, data: &T) -> Result<Response, AppError> {
    if ctx.is_cancelled() {
        return Err(AppError::internal(anyhow!(
            "client disconnected, do not send response"
        )));
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(write(ctx.meta(), status.into_response()));
    }

    Ok(write(ctx.meta(), (status, Json(data)).into_response()))
}

/// Renders `err` and records its status. Server errors carry only the
/// generic message.
pub fn respond_error(meta: &RequestMeta, err: AppError) -> Response {
    write(meta, err.into_response())
}

// The only place a response status is recorded on the request metadata.
fn write(meta: &RequestMeta, response: Response) -> Response {
    meta.set_status(response.status());
    response
}

pub fn no_content(ctx: &Ctx) -> Result<Response, AppError> {
    respond(ctx, StatusCode::NO_CONTENT, &())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::RequestMeta;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> Ctx {
        Ctx::background(Arc::new(RequestMeta::detached()))
    }

    #[tokio::test]
    async fn test_respond_json() {
        let ctx = ctx();
        let res = respond(&ctx, StatusCode::CREATED, &json!({"name": "Alex"})).unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(
            res.headers()["content-type"],
            "application/json"
        );
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({"name": "Alex"}));
        assert_eq!(ctx.meta().status(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let ctx = ctx();
        let res = no_content(&ctx).unwrap();

        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_respond_error_records_status() {
        let ctx = ctx();
        let res = respond_error(ctx.meta(), AppError::not_found(anyhow!("user not found")));

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.meta().status(), Some(StatusCode::NOT_FOUND));
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            json!({"error": "user not found"})
        );
    }

    #[test]
    fn test_cancelled_context_refuses_response() {
        let ctx = ctx();
        ctx.cancellation_token().cancel();

        let err = respond(&ctx, StatusCode::OK, &json!({})).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.meta().status(), None);
    }
}
