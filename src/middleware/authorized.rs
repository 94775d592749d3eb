use std::sync::Arc;

use anyhow::anyhow;
use roster_auth::Auth;
use roster_core::AppError;
use roster_models::Role;
use roster_web::{Ctx, Middleware, Next, Request};

use crate::middleware::context::claims;

/// Lets the request through when the caller holds one of `allowed`.
///
/// Runs after [`authenticate`](super::authenticate::authenticate); without
/// claims in the context the request is unauthorized.
pub fn authorized(auth: Arc<Auth>, allowed: &'static [Role]) -> Middleware {
    Middleware::from_fn(move |ctx: Ctx, req: Request, next: Next| {
        let auth = auth.clone();

        async move {
            let claims = claims(&ctx).map_err(|_| {
                AppError::unauthorized(anyhow!("you are not authorized for that action, no claims"))
            })?;

            auth.authorized(claims, allowed)
                .map_err(AppError::forbidden)?;

            next.run(ctx, req).await
        }
    })
}
