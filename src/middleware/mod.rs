//! Middlewares for the [`Mux`](roster_web::Mux).
//!
//! # Modules
//!
//! - [`trace`]: `http.request` span and trace id
//! - [`logger`]: request started / completed log lines
//! - [`errors`]: renders `AppError`s into responses
//! - [`metrics`]: Prometheus request metrics
//! - [`panics`]: panic recovery
//! - [`authenticate`]: bearer token verification and user lookup
//! - [`authorized`]: role checks
//! - [`context`]: typed accessors for what `authenticate` stores
//!
//! # Order
//!
//! Every route runs inside the global chain, outermost first:
//!
//! ```text
//! trace -> logger -> errors -> metrics -> panics -> [authenticate -> authorized] -> handler
//! ```
//!
//! The logger sits outside `errors` so it sees the final status, and
//! `metrics` sits outside `panics` so panics are counted as errors.

pub mod authenticate;
pub mod authorized;
pub mod context;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod panics;
pub mod trace;

use roster_web::Middleware;

pub use authenticate::authenticate;
pub use authorized::authorized;
pub use errors::errors;
pub use logger::logger;
pub use metrics::metrics;
pub use panics::panics;
pub use trace::trace;

/// The global chain, in order.
pub fn global() -> Vec<Middleware> {
    vec![trace(), logger(), errors(), metrics(), panics()]
}
