use std::sync::Arc;

use axum::http::Method;
use roster_models::{ADMIN_ONLY, ADMIN_OR_USER};
use roster_web::{Mux, with_state};

use crate::middleware::{authenticate, authorized};
use crate::modules::users::controller;
use crate::state::AppState;

const VERSION: &str = "v1";

/// Registers the user routes on `mux`.
///
/// | Method | Path                      | Access              |
/// |--------|---------------------------|---------------------|
/// | POST   | `/v1/users`               | public              |
/// | POST   | `/v1/users/login`         | public              |
/// | GET    | `/v1/users`               | admin or user       |
/// | GET    | `/v1/users/{id}`          | admin or user       |
/// | PUT    | `/v1/users/{id}`          | self or admin       |
/// | DELETE | `/v1/users/{id}`          | self or admin       |
/// | PUT    | `/v1/users/disable/{id}`  | self or admin       |
/// | PUT    | `/v1/users/roles/{id}`    | admin               |
pub fn routes(mux: &mut Mux, state: &AppState) {
    let authen = authenticate(
        state.auth.clone(),
        state.bus.clone(),
        state.auth_config.lookup_timeout,
    );
    let any_role = authorized(Arc::clone(&state.auth), ADMIN_OR_USER);
    let admin = authorized(Arc::clone(&state.auth), ADMIN_ONLY);

    let user_mids = [authen.clone(), any_role];
    let admin_mids = [authen, admin];

    mux.handle(
        Method::POST,
        VERSION,
        "/users",
        with_state(state.clone(), controller::create),
        &[],
    );
    mux.handle(
        Method::POST,
        VERSION,
        "/users/login",
        with_state(state.clone(), controller::login),
        &[],
    );
    mux.handle(
        Method::GET,
        VERSION,
        "/users",
        with_state(state.clone(), controller::query),
        &user_mids,
    );
    mux.handle(
        Method::GET,
        VERSION,
        "/users/{id}",
        with_state(state.clone(), controller::query_by_id),
        &user_mids,
    );
    mux.handle(
        Method::PUT,
        VERSION,
        "/users/{id}",
        with_state(state.clone(), controller::update),
        &user_mids,
    );
    mux.handle(
        Method::DELETE,
        VERSION,
        "/users/{id}",
        with_state(state.clone(), controller::delete),
        &user_mids,
    );
    mux.handle(
        Method::PUT,
        VERSION,
        "/users/disable/{id}",
        with_state(state.clone(), controller::disable),
        &user_mids,
    );
    mux.handle(
        Method::PUT,
        VERSION,
        "/users/roles/{id}",
        with_state(state.clone(), controller::update_roles),
        &admin_mids,
    );
}
