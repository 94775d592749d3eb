use std::sync::Arc;

use roster_auth::Auth;
use roster_config::{AuthConfig, CorsConfig, WebConfig};
use roster_db::PgPool;

use crate::modules::users::UserBus;
use crate::validator::RequestValidator;

/// Everything handlers and middlewares share, cloned into each route.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth: Arc<Auth>,
    pub bus: UserBus,
    pub validator: RequestValidator,
    pub auth_config: AuthConfig,
    pub web_config: WebConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    pub fn new(
        db: PgPool,
        auth: Arc<Auth>,
        bus: UserBus,
        auth_config: AuthConfig,
        web_config: WebConfig,
        cors_config: CorsConfig,
    ) -> Self {
        Self {
            db,
            auth,
            bus,
            validator: RequestValidator::new(web_config.body_limit),
            auth_config,
            web_config,
            cors_config,
        }
    }
}
