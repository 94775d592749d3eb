use axum::http::Method;
use roster_web::{Mux, with_state};

use crate::middleware::panics;
use crate::modules::health::controller;
use crate::state::AppState;

/// Registers `/v1/readiness` and `/v1/liveness` outside the global chain.
pub fn routes(mux: &mut Mux, state: &AppState) {
    let mids = [panics()];

    mux.handle_probe(
        Method::GET,
        "v1",
        "/readiness",
        with_state(state.clone(), controller::readiness),
        &mids,
    );
    mux.handle_probe(
        Method::GET,
        "v1",
        "/liveness",
        with_state(state.clone(), controller::liveness),
        &mids,
    );
}
