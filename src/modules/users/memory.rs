use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use roster_core::{Direction, OrderBy, Page};
use roster_models::{QueryFilter, User, UserOrderField};
use uuid::Uuid;

use super::bus::{UserError, UserStore};

/// [`UserStore`] kept in a map, with the same filtering, ordering and email
/// uniqueness as the Postgres store.
#[derive(Debug, Default)]
pub struct MemUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    fn filtered(&self, filter: &QueryFilter) -> Vec<User> {
        self.users
            .read()
            .values()
            .filter(|user| matches(user, filter))
            .cloned()
            .collect()
    }
}

fn matches(user: &User, filter: &QueryFilter) -> bool {
    if let Some(name) = &filter.name {
        if !user.name.contains(name.as_str()) {
            return false;
        }
    }
    if let Some(department) = filter.department {
        if user.department != department {
            return false;
        }
    }
    if let Some(roles) = &filter.roles {
        if !user.roles.iter().any(|role| roles.contains(role)) {
            return false;
        }
    }
    if let Some(start) = filter.start_created_at {
        if user.created_at < start {
            return false;
        }
    }
    if let Some(end) = filter.end_created_at {
        if user.created_at > end {
            return false;
        }
    }
    true
}

fn compare(a: &User, b: &User, field: UserOrderField) -> Ordering {
    match field {
        UserOrderField::Name => a.name.cmp(&b.name),
        UserOrderField::Email => a.email.cmp(&b.email),
        UserOrderField::CreatedAt => a.created_at.cmp(&b.created_at),
        UserOrderField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn create(&self, user: &User) -> Result<(), UserError> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::DuplicatedEmail);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), UserError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(UserError::DuplicatedEmail);
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(UserError::NotFound),
        }
    }

    async fn delete(&self, user: &User) -> Result<(), UserError> {
        self.users.write().remove(&user.id);
        Ok(())
    }

    async fn query(
        &self,
        filter: &QueryFilter,
        order: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> Result<Vec<User>, UserError> {
        let mut users = self.filtered(filter);
        users.sort_by(|a, b| {
            let ord = compare(a, b, order.field);
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });

        Ok(users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.rows() as usize)
            .collect())
    }

    async fn count(&self, filter: &QueryFilter) -> Result<i64, UserError> {
        Ok(self.filtered(filter).len() as i64)
    }

    async fn query_by_id(&self, id: Uuid) -> Result<User, UserError> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or(UserError::NotFound)
    }

    async fn query_by_email(&self, email: &str) -> Result<User, UserError> {
        self.users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(UserError::NotFound)
    }
}
