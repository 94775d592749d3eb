//! Administrative commands run by `roster-cli`.
//!
//! - [`keygen`]: RSA signing key generation
//! - [`seeder`]: fake users for local development
//! - [`create_admin`]: the first admin account

pub mod keygen;
pub mod seeder;

use anyhow::Context;
use roster_models::{CreateUserDto, NewUser, Role, User};
use validator::Validate;

use crate::modules::users::UserBus;

pub use keygen::generate_key;
pub use seeder::seed_users;

/// Creates an admin through the bus, applying the same validation as the
/// registration endpoint.
pub async fn create_admin(
    bus: &UserBus,
    name: &str,
    email: &str,
    department: &str,
    password: &str,
) -> anyhow::Result<User> {
    let dto = CreateUserDto {
        name: name.to_string(),
        email: email.to_string(),
        roles: Role::to_strings(&[Role::Admin, Role::User]),
        department: department.to_string(),
        password: password.to_string(),
        password_confirm: password.to_string(),
    };
    dto.validate().context("invalid admin details")?;

    let user = NewUser::try_from(dto)?;
    let user = bus.create(user).await.context("create admin")?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::users::MemUserStore;
    use std::sync::Arc;

    fn bus() -> UserBus {
        UserBus::new(Arc::new(MemUserStore::new())).with_bcrypt_cost(4)
    }

    #[tokio::test]
    async fn test_create_admin_has_admin_role() {
        let user = create_admin(&bus(), "Root Admin", "root@example.com", "sales", "password123")
            .await
            .unwrap();
        assert!(user.is_admin());
        assert!(user.enabled);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_bad_input() {
        let err = create_admin(&bus(), "Root Admin", "not-an-email", "sales", "short")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid admin details"));
    }
}
