use anyhow::anyhow;
use axum::http::StatusCode;
use roster_auth::Claims;
use roster_core::{AppError, PageResult};
use roster_models::{
    CreateUserDto, LoginDto, NewUser, Role, TokenResponse, UpdateRolesDto, UpdateUser,
    UpdateUserDto, User, UserResponse,
};
use roster_observability::{
    track_token_issued, track_user_created, track_user_login_failure, track_user_login_success,
};
use roster_web::{Ctx, Request, Response, no_content, respond};
use uuid::Uuid;

use crate::docs::ErrorResponse;
use crate::middleware::context;
use crate::modules::users::bus::UserError;
use crate::modules::users::filters::parse_query;
use crate::state::AppState;

fn user_error(err: UserError) -> AppError {
    match err {
        UserError::DuplicatedEmail => AppError::conflict(err),
        UserError::NotFound => AppError::not_found(err),
        UserError::AuthenticationFailed => {
            AppError::unauthorized(anyhow!("invalid email or password"))
        }
        UserError::Store(e) => AppError::internal(e),
    }
}

fn path_id(ctx: &Ctx) -> Result<Uuid, AppError> {
    let raw = ctx.param("id").unwrap_or_default();
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(anyhow!("invalid user id: {raw}")))
}

fn ensure_self_or_admin(caller: &User, target: Uuid) -> Result<(), AppError> {
    if caller.id == target || caller.is_admin() {
        return Ok(());
    }
    Err(AppError::forbidden(anyhow!("attempted action is not allowed")))
}

fn roles_label(roles: &[Role]) -> String {
    Role::to_strings(roles).join(",")
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let claims = Claims::new(
        state.auth_config.issuer.clone(),
        user.id.to_string(),
        user.roles.clone(),
        state.auth_config.token_max_age,
    );
    let token = state.auth.generate_active(&claims)?;

    if let Some(kid) = state.auth.keystore().active_kid() {
        track_token_issued(&kid);
    }

    Ok(token)
}

/// Loads the target of a `/users/{id}` route, reusing the caller when it is
/// the same user.
async fn load_target(state: &AppState, caller: &User, id: Uuid) -> Result<User, AppError> {
    if caller.id == id {
        return Ok(caller.clone());
    }
    state.bus.query_by_id(id).await.map_err(user_error)
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created, with an access token", body = UserResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    ),
    tag = "Users"
)]
pub async fn create(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> {
    let dto: CreateUserDto = state.validator.decode(req).await?;
    let nu = NewUser::try_from(dto).map_err(AppError::bad_request)?;

    let user = state.bus.create(nu).await.map_err(user_error)?;
    track_user_created(&roles_label(&user.roles));

    let token = issue_token(&state, &user)?;
    let mut body = UserResponse::from(user);
    body.token = Some(token);

    respond(&ctx, StatusCode::CREATED, &body)
}

/// List users
#[utoipa::path(
    get,
    path = "/v1/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, from 1"),
        ("rows" = Option<i64>, Query, description = "Rows per page, at most 100"),
        ("order_by" = Option<String>, Query, description = "`field,direction`, e.g. `name,desc`"),
        ("name" = Option<String>, Query, description = "Substring of the name"),
        ("department" = Option<String>, Query, description = "sales, shipping or marketing"),
        ("roles" = Option<Vec<String>>, Query, description = "Any of these roles; repeatable"),
        ("start_created_at" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("end_created_at" = Option<String>, Query, description = "RFC 3339 upper bound"),
    ),
    responses(
        (status = 200, description = "Page of users", body = PageResult<UserResponse>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn query(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> {
    let query = parse_query(req.uri().query())?;

    let (users, total) = tokio::try_join!(
        state.bus.query(&query.filter, &query.order, &query.page),
        state.bus.count(&query.filter),
    )
    .map_err(user_error)?;

    let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    respond(&ctx, StatusCode::OK, &PageResult::new(items, total, &query.page))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn query_by_id(state: AppState, ctx: Ctx, _req: Request) -> Result<Response, AppError> {
    let id = path_id(&ctx)?;
    let user = state.bus.query_by_id(id).await.map_err(user_error)?;

    respond(&ctx, StatusCode::OK, &UserResponse::from(user))
}

/// Update a user
///
/// Users may update themselves; admins may update anyone. Only admins may
/// change roles.
#[utoipa::path(
    put,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> {
    let id = path_id(&ctx)?;
    let caller = context::user(&ctx)?;
    ensure_self_or_admin(caller, id)?;

    let dto: UpdateUserDto = state.validator.decode(req).await?;
    if dto.roles.is_some() && !caller.is_admin() {
        return Err(AppError::forbidden(anyhow!("only admins may change roles")));
    }
    let uu = UpdateUser::try_from(dto).map_err(AppError::bad_request)?;

    let target = load_target(&state, caller, id).await?;
    let user = state.bus.update(target, uu).await.map_err(user_error)?;

    respond(&ctx, StatusCode::OK, &UserResponse::from(user))
}

/// Replace a user's roles
#[utoipa::path(
    put,
    path = "/v1/users/roles/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateRolesDto,
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Validation failed or user is disabled", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_roles(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> {
    let id = path_id(&ctx)?;
    let dto: UpdateRolesDto = state.validator.decode(req).await?;
    let uu = UpdateUser::try_from(dto).map_err(AppError::bad_request)?;

    let target = state.bus.query_by_id(id).await.map_err(user_error)?;
    if !target.enabled {
        return Err(AppError::bad_request(anyhow!("user is disabled")));
    }
    let user = state.bus.update(target, uu).await.map_err(user_error)?;

    respond(&ctx, StatusCode::OK, &UserResponse::from(user))
}

/// Disable a user
///
/// Disabling an already disabled user succeeds.
#[utoipa::path(
    put,
    path = "/v1/users/disable/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The disabled user", body = UserResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn disable(state: AppState, ctx: Ctx, _req: Request) -> Result<Response, AppError> {
    let id = path_id(&ctx)?;
    let caller = context::user(&ctx)?;
    ensure_self_or_admin(caller, id)?;

    let target = load_target(&state, caller, id).await?;
    let user = state
        .bus
        .update(target, UpdateUser::disable())
        .await
        .map_err(user_error)?;

    respond(&ctx, StatusCode::OK, &UserResponse::from(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete(state: AppState, ctx: Ctx, _req: Request) -> Result<Response, AppError> {
    let id = path_id(&ctx)?;
    let caller = context::user(&ctx)?;
    ensure_self_or_admin(caller, id)?;

    let target = load_target(&state, caller, id).await?;
    state.bus.delete(&target).await.map_err(user_error)?;

    no_content(&ctx)
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/v1/users/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
    ),
    tag = "Users"
)]
pub async fn login(state: AppState, ctx: Ctx, req: Request) -> Result<Response, AppError> {
    let dto: LoginDto = state.validator.decode(req).await?;

    let user = match state.bus.authenticate(&dto.email, &dto.password).await {
        Ok(user) => user,
        Err(UserError::AuthenticationFailed) => {
            track_user_login_failure("invalid_credentials");
            return Err(user_error(UserError::AuthenticationFailed));
        }
        Err(e) => return Err(user_error(e)),
    };

    if !user.enabled {
        track_user_login_failure("disabled");
        return Err(AppError::unauthorized(anyhow!("user is disabled")));
    }

    let token = issue_token(&state, &user)?;
    track_user_login_success(&roles_label(&user.roles));

    respond(&ctx, StatusCode::OK, &TokenResponse { token })
}
