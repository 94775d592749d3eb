use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::http::header::AUTHORIZATION;
use roster_auth::Auth;
use roster_core::AppError;
use roster_web::{Ctx, Middleware, Next, Request, context_error};
use uuid::Uuid;

use crate::middleware::context::{set_claims, set_user};
use crate::modules::users::{UserBus, UserError};

/// Verifies the bearer token, loads its user and stores both in the context.
///
/// The user lookup is bounded by `lookup_timeout` and by the request's own
/// cancellation; running out of time is a 503. Tokens of disabled or deleted users are rejected even though
/// they still verify.
pub fn authenticate(auth: Arc<Auth>, bus: UserBus, lookup_timeout: Duration) -> Middleware {
    Middleware::from_fn(move |ctx: Ctx, req: Request, next: Next| {
        let auth = auth.clone();
        let bus = bus.clone();

        async move {
            let bearer = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();

            let claims = auth.verify_token(bearer).map_err(AppError::unauthorized)?;

            if claims.sub.is_empty() {
                return Err(AppError::unauthorized(anyhow!(
                    "you are not authorized for that action, no subject"
                )));
            }
            let user_id = Uuid::parse_str(&claims.sub)
                .map_err(|e| AppError::unauthorized(anyhow!("invalid subject: {e}")))?;

            let user = ctx
                .with_timeout(lookup_timeout)
                .run(bus.query_by_id(user_id))
                .await
                .map_err(context_error)?
                .map_err(|e| match e {
                    UserError::NotFound => AppError::unauthorized(anyhow!("user not found")),
                    other => AppError::internal(other),
                })?;

            if !user.enabled {
                return Err(AppError::unauthorized(anyhow!("user is disabled")));
            }

            let ctx = set_claims(&ctx, claims)?;
            let ctx = set_user(&ctx, user)?;

            next.run(ctx, req).await
        }
    })
}
