use std::env;
use std::time::Duration;

use crate::env_or;

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub api_host: String,
    /// Serves `/metrics`.
    pub debug_host: String,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub body_limit: usize,
    pub build: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0:8000".to_string(),
            debug_host: "0.0.0.0:3000".to_string(),
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(20),
            body_limit: 1024 * 1024,
            build: "develop".to_string(),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            debug_host: env::var("DEBUG_HOST").unwrap_or(defaults.debug_host),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT", 10)),
            shutdown_timeout: Duration::from_secs(env_or("SHUTDOWN_TIMEOUT", 20)),
            body_limit: env_or("BODY_LIMIT", defaults.body_limit),
            build: env::var("BUILD").unwrap_or(defaults.build),
        }
    }
}
