use std::collections::BTreeMap;

use roster_models::{
    CreateUserDto, Department, LoginDto, Role, TokenResponse, UpdateRolesDto, UpdateUserDto,
    UserResponse,
};
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::modules::health::controller::Info;

/// Body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field messages, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::users::controller::create,
        crate::modules::users::controller::login,
        crate::modules::users::controller::query,
        crate::modules::users::controller::query_by_id,
        crate::modules::users::controller::update,
        crate::modules::users::controller::update_roles,
        crate::modules::users::controller::disable,
        crate::modules::users::controller::delete,
        crate::modules::health::controller::readiness,
        crate::modules::health::controller::liveness,
    ),
    components(
        schemas(
            UserResponse,
            CreateUserDto,
            UpdateUserDto,
            UpdateRolesDto,
            LoginDto,
            TokenResponse,
            Role,
            Department,
            ErrorResponse,
            Info,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "User management endpoints"),
        (name = "Health", description = "Readiness and liveness probes")
    ),
    info(
        title = "Roster API",
        version = "0.1.0",
        description = "User management API with RS256 JWT authentication.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
