use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::env_or;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Directory scanned for `*.pem` private keys.
    pub keys_dir: PathBuf,
    /// Key used to sign new tokens. Falls back to the first loaded key.
    pub active_kid: Option<String>,
    pub issuer: String,
    pub token_max_age: Duration,
    /// Upper bound for the user lookup done while authenticating a request.
    pub lookup_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from("/etc/rsa-keys"),
            active_kid: None,
            issuer: "roster".to_string(),
            token_max_age: Duration::from_secs(3600),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            keys_dir: env::var("AUTH_KEYS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.keys_dir),
            active_kid: env::var("AUTH_ACTIVE_KID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            issuer: env::var("AUTH_ISSUER").unwrap_or(defaults.issuer),
            token_max_age: Duration::from_secs(env_or("AUTH_TOKEN_MAX_AGE", 3600)), // 1 hour
            lookup_timeout: Duration::from_secs(env_or("AUTH_LOOKUP_TIMEOUT", 5)),
        }
    }
}
