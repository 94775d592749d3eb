//! User domain models and DTOs.
//!
//! [`User`] is the stored entity. [`NewUser`] and [`UpdateUser`] are the
//! already-validated inputs the business layer accepts. The `*Dto` types are
//! the HTTP request bodies and [`UserResponse`] is what clients receive.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::role::{Department, Role, ValueError};

/// A user as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub password_hash: String,
    pub department: Department,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// Input for registering a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub department: Department,
    pub password: String,
}

/// Partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<Department>,
    pub roles: Option<Vec<Role>>,
    pub password: Option<String>,
    pub enabled: Option<bool>,
}

impl UpdateUser {
    pub fn disable() -> Self {
        Self {
            enabled: Some(false),
            ..Self::default()
        }
    }

    pub fn roles(roles: Vec<Role>) -> Self {
        Self {
            roles: Some(roles),
            ..Self::default()
        }
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_roles(roles: &Vec<String>) -> Result<(), ValidationError> {
    if roles.is_empty() {
        return Err(error("roles", "at least one role is required"));
    }
    if Role::parse_many(roles).is_err() {
        return Err(error("roles", "roles must be one of: admin, user"));
    }
    Ok(())
}

fn validate_department(department: &str) -> Result<(), ValidationError> {
    department
        .parse::<Department>()
        .map(|_| ())
        .map_err(|_| error("department", "department must be one of: sales, shipping, marketing"))
}

fn validate_update_password(dto: &UpdateUserDto) -> Result<(), ValidationError> {
    if dto.password.is_some() && dto.password != dto.password_confirm {
        return Err(error("password_confirm", "password_confirm must match password"));
    }
    Ok(())
}

/// Registration request body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 4, max = 120, message = "name must be between 4 and 120 characters"))]
    #[schema(example = "Alex Doe")]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    #[schema(example = "alex@example.com")]
    pub email: String,
    #[validate(custom(function = "validate_roles"))]
    #[schema(example = json!(["user"]))]
    pub roles: Vec<String>,
    #[validate(custom(function = "validate_department"))]
    #[schema(example = "sales")]
    pub department: String,
    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "password_confirm must match password"))]
    pub password_confirm: String,
}

impl TryFrom<CreateUserDto> for NewUser {
    type Error = ValueError;

    fn try_from(dto: CreateUserDto) -> Result<Self, Self::Error> {
        Ok(Self {
            roles: Role::parse_many(&dto.roles)?,
            department: dto.department.parse()?,
            name: dto.name,
            email: dto.email,
            password: dto.password,
        })
    }
}

/// Profile update request body.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update_password"))]
pub struct UpdateUserDto {
    #[validate(length(min = 4, max = 120, message = "name must be between 4 and 120 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_roles"))]
    pub roles: Option<Vec<String>>,
    #[validate(custom(function = "validate_department"))]
    pub department: Option<String>,
    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub enabled: Option<bool>,
}

impl TryFrom<UpdateUserDto> for UpdateUser {
    type Error = ValueError;

    fn try_from(dto: UpdateUserDto) -> Result<Self, Self::Error> {
        let roles = match dto.roles {
            Some(roles) => Some(Role::parse_many(&roles)?),
            None => None,
        };
        let department = match dto.department {
            Some(department) => Some(department.parse()?),
            None => None,
        };

        Ok(Self {
            name: dto.name,
            email: dto.email,
            department,
            roles,
            password: dto.password,
            enabled: dto.enabled,
        })
    }
}

/// Role assignment request body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRolesDto {
    #[validate(custom(function = "validate_roles"))]
    #[schema(example = json!(["admin", "user"]))]
    pub roles: Vec<String>,
}

impl TryFrom<UpdateRolesDto> for UpdateUser {
    type Error = ValueError;

    fn try_from(dto: UpdateRolesDto) -> Result<Self, Self::Error> {
        Ok(Self::roles(Role::parse_many(&dto.roles)?))
    }
}

/// Login request body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginDto {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// User as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub department: Department,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: user.roles,
            department: user.department,
            enabled: user.enabled,
            created_at: user.created_at,
            updated_at: user.updated_at,
            token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dto() -> CreateUserDto {
        CreateUserDto {
            name: "Alex Doe".to_string(),
            email: "alex@example.com".to_string(),
            roles: vec!["user".to_string()],
            department: "sales".to_string(),
            password: "gophers123".to_string(),
            password_confirm: "gophers123".to_string(),
        }
    }

    #[test]
    fn test_create_dto_valid() {
        assert!(create_dto().validate().is_ok());
    }

    #[test]
    fn test_create_dto_short_name() {
        let dto = CreateUserDto {
            name: "Al".to_string(),
            ..create_dto()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_create_dto_password_mismatch() {
        let dto = CreateUserDto {
            password_confirm: "different".to_string(),
            ..create_dto()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirm"));
    }

    #[test]
    fn test_create_dto_unknown_role_and_department() {
        let dto = CreateUserDto {
            roles: vec!["owner".to_string()],
            department: "engineering".to_string(),
            ..create_dto()
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("roles"));
        assert!(fields.contains_key("department"));
    }

    #[test]
    fn test_create_dto_empty_roles() {
        let dto = CreateUserDto {
            roles: vec![],
            ..create_dto()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_new_user_from_dto() {
        let new_user = NewUser::try_from(create_dto()).unwrap();
        assert_eq!(new_user.roles, vec![Role::User]);
        assert_eq!(new_user.department, Department::Sales);
    }

    #[test]
    fn test_update_dto_empty_is_valid() {
        assert!(UpdateUserDto::default().validate().is_ok());
    }

    #[test]
    fn test_update_dto_password_requires_confirm() {
        let dto = UpdateUserDto {
            password: Some("newpassword".to_string()),
            ..UpdateUserDto::default()
        };
        assert!(dto.validate().is_err());

        let dto = UpdateUserDto {
            password: Some("newpassword".to_string()),
            password_confirm: Some("newpassword".to_string()),
            ..UpdateUserDto::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_update_user_from_dto_only_sets_supplied_fields() {
        let dto = UpdateUserDto {
            department: Some("marketing".to_string()),
            ..UpdateUserDto::default()
        };
        let update = UpdateUser::try_from(dto).unwrap();
        assert_eq!(update.department, Some(Department::Marketing));
        assert!(update.name.is_none());
        assert!(update.roles.is_none());
        assert!(update.enabled.is_none());
    }

    #[test]
    fn test_user_response_omits_empty_token() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Alex Doe".to_string(),
            email: "alex@example.com".to_string(),
            roles: vec![Role::Admin],
            password_hash: "hash".to_string(),
            department: Department::Sales,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("token").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["roles"][0], "admin");
    }
}
