//! JWT claim structure for access tokens.

use std::time::Duration;

use chrono::Utc;
use roster_models::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JWT claims for access tokens.
///
/// - `iss`: issuer
/// - `sub`: user id
/// - `iat`: issued-at (Unix timestamp)
/// - `exp`: expiry (Unix timestamp)
/// - `roles`: roles held when the token was issued
///
/// `roles` decodes straight into [`Role`], so a token naming an unknown role
/// never verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub roles: Vec<Role>,
}

impl Claims {
    /// Claims issued now and valid for `max_age`.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        roles: Vec<Role>,
        max_age: Duration,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            iat: now,
            exp: now + max_age.as_secs() as i64,
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_expiry_from_max_age() {
        let claims = Claims::new("roster", "u1", vec![Role::User], Duration::from_secs(3600));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.has_role(Role::User));
        assert!(!claims.has_role(Role::Admin));
    }

    #[test]
    fn test_roles_serialize_as_strings() {
        let claims = Claims::new("roster", "u1", vec![Role::Admin], Duration::from_secs(60));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["roles"], serde_json::json!(["admin"]));
    }
}
