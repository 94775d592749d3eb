//! Fake users for local development.

use std::time::Instant;

use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use roster_models::{Department, NewUser, Role};
use tracing::debug;

use crate::modules::users::{UserBus, UserError};

/// Password given to every seeded user.
pub const SEED_PASSWORD: &str = "password123";

const DEPARTMENTS: [Department; 3] = [Department::Sales, Department::Shipping, Department::Marketing];

/// Builds a random user. Roughly one in ten is an admin.
pub fn fake_user() -> NewUser {
    let mut rng = rand::thread_rng();
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    let email: String = SafeEmail().fake();

    let roles = if rng.gen_ratio(1, 10) {
        vec![Role::Admin, Role::User]
    } else {
        vec![Role::User]
    };

    NewUser {
        name: format!("{first} {last}"),
        // Prefix keeps emails unique across large seeds.
        email: format!("{}.{email}", rng.gen_range(0..1_000_000u32)),
        roles,
        department: DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())],
        password: SEED_PASSWORD.to_string(),
    }
}

/// Creates `count` fake users through the bus.
///
/// Duplicate emails are skipped rather than failing the run.
///
/// # Returns
///
/// The number of users created.
pub async fn seed_users(bus: &UserBus, count: usize) -> anyhow::Result<usize> {
    let start = Instant::now();
    println!("🌱 Seeding {count} users...");

    let mut created = 0;
    for _ in 0..count {
        match bus.create(fake_user()).await {
            Ok(_) => created += 1,
            Err(UserError::DuplicatedEmail) => debug!("skipping duplicate seed email"),
            Err(e) => return Err(e.into()),
        }
    }

    println!("✅ Created {created} users in {:?}", start.elapsed());
    println!("\n📝 Default password for all users: {SEED_PASSWORD}");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::users::MemUserStore;
    use std::sync::Arc;

    #[test]
    fn test_fake_user_is_valid_input() {
        let user = fake_user();
        assert!(user.name.len() >= 4);
        assert!(user.email.contains('@'));
        assert!(user.roles.contains(&Role::User));
        assert_eq!(user.password, SEED_PASSWORD);
    }

    #[tokio::test]
    async fn test_seed_users_creates_count() {
        let store = Arc::new(MemUserStore::new());
        let bus = UserBus::new(store.clone()).with_bcrypt_cost(4);

        let created = seed_users(&bus, 3).await.unwrap();
        assert_eq!(created, 3);
        assert_eq!(store.len(), 3);
    }
}
