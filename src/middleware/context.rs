//! Typed access to the values the authentication middleware stores.

use roster_auth::Claims;
use roster_models::User;
use roster_web::{ContextError, Ctx};

pub fn set_claims(ctx: &Ctx, claims: Claims) -> Result<Ctx, ContextError> {
    ctx.with_value(claims)
}

/// Claims of the authenticated caller.
pub fn claims(ctx: &Ctx) -> Result<&Claims, ContextError> {
    ctx.value::<Claims>()
}

pub fn set_user(ctx: &Ctx, user: User) -> Result<Ctx, ContextError> {
    ctx.with_value(user)
}

/// The authenticated caller, as loaded when the request was authenticated.
pub fn user(ctx: &Ctx) -> Result<&User, ContextError> {
    ctx.value::<User>()
}
