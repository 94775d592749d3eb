//! Closed value sets: user roles and departments.
//!
//! Unknown values are rejected wherever they enter the system (JSON bodies,
//! token claims, database rows) instead of being registered at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("invalid department: {0}")]
    InvalidDepartment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Allowed-role sets used by the authorization middleware.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const ADMIN_OR_USER: &[Role] = &[Role::Admin, Role::User];

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Parses every value, failing on the first unknown role.
    pub fn parse_many<S: AsRef<str>>(values: &[S]) -> Result<Vec<Role>, ValueError> {
        values.iter().map(|v| v.as_ref().parse()).collect()
    }

    pub fn to_strings(roles: &[Role]) -> Vec<String> {
        roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(ValueError::InvalidRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Sales,
    Shipping,
    Marketing,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Shipping => "shipping",
            Self::Marketing => "marketing",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(Self::Sales),
            "shipping" => Ok(Self::Shipping),
            "marketing" => Ok(Self::Marketing),
            other => Err(ValueError::InvalidDepartment(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_parse_unknown_role() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role: superuser");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_parse_many_stops_on_unknown() {
        assert_eq!(
            Role::parse_many(&["admin", "user"]).unwrap(),
            vec![Role::Admin, Role::User]
        );
        assert_eq!(
            Role::parse_many(&["admin", "root"]),
            Err(ValueError::InvalidRole("root".to_string()))
        );
    }

    #[test]
    fn test_to_strings() {
        assert_eq!(Role::to_strings(&Role::ALL), vec!["admin", "user"]);
    }

    #[test]
    fn test_role_serde_rejects_unknown() {
        let roles: Vec<Role> = serde_json::from_str(r#"["admin","user"]"#).unwrap();
        assert_eq!(roles, vec![Role::Admin, Role::User]);
        assert!(serde_json::from_str::<Vec<Role>>(r#"["owner"]"#).is_err());
    }

    #[test]
    fn test_allowed_sets_have_no_duplicates() {
        assert_eq!(ADMIN_OR_USER.len(), 2);
        assert!(ADMIN_OR_USER.contains(&Role::Admin));
        assert!(ADMIN_OR_USER.contains(&Role::User));
        assert_eq!(ADMIN_ONLY, &[Role::Admin]);
    }

    #[test]
    fn test_department_round_trip_names() {
        for dept in [Department::Sales, Department::Shipping, Department::Marketing] {
            assert_eq!(dept.as_str().parse::<Department>().unwrap(), dept);
        }
        assert!("engineering".parse::<Department>().is_err());
    }
}
