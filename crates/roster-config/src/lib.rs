//! # Roster Config
//!
//! Configuration types for the Roster API, loaded from environment variables:
//!
//! - [`auth`]: key directory, active key and token lifetime
//! - [`web`]: listen addresses and request timeouts
//! - [`database`]: PostgreSQL connection settings
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//!
//! # Example
//!
//! ```ignore
//! use roster_config::{AuthConfig, WebConfig};
//!
//! let auth_config = AuthConfig::from_env();
//! let web_config = WebConfig::from_env();
//! ```

pub mod auth;
pub mod cors;
pub mod database;
pub mod web;

pub use auth::AuthConfig;
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use web::WebConfig;

use std::env;
use std::str::FromStr;

pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
