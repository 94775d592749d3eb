use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{OrderBy, Page};
use roster_models::{QueryFilter, Role, User, UserOrderField};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::bus::{UserError, UserStore};

const USER_COLUMNS: &str =
    "id, name, email, roles, password_hash, department, enabled, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    roles: Vec<String>,
    password_hash: String,
    department: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles = Role::parse_many(&row.roles)
            .with_context(|| format!("decoding roles of user {}", row.id))?;
        let department = row
            .department
            .parse()
            .with_context(|| format!("decoding department of user {}", row.id))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            roles,
            password_hash: row.password_hash,
            department,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// [`UserStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_error(err: sqlx::Error, action: &'static str) -> UserError {
    match &err {
        sqlx::Error::RowNotFound => UserError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            UserError::DuplicatedEmail
        }
        _ => UserError::Store(anyhow::Error::new(err).context(action)),
    }
}

/// Escapes `LIKE` wildcards so `name` matches as a plain substring, the way
/// the in-memory store compares names.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &QueryFilter) {
    let mut sep = " WHERE ";

    if let Some(name) = &filter.name {
        qb.push(sep)
            .push("name LIKE ")
            .push_bind(format!("%{}%", escape_like(name)))
            .push(r" ESCAPE '\'");
        sep = " AND ";
    }
    if let Some(department) = filter.department {
        qb.push(sep)
            .push("department = ")
            .push_bind(department.as_str());
        sep = " AND ";
    }
    if let Some(roles) = &filter.roles {
        qb.push(sep)
            .push("roles && ")
            .push_bind(Role::to_strings(roles));
        sep = " AND ";
    }
    if let Some(start) = filter.start_created_at {
        qb.push(sep).push("created_at >= ").push_bind(start);
        sep = " AND ";
    }
    if let Some(end) = filter.end_created_at {
        qb.push(sep).push("created_at <= ").push_bind(end);
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(name = "user.store.create", skip_all)]
    async fn create(&self, user: &User) -> Result<(), UserError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, name, email, roles, password_hash, department, enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(Role::to_strings(&user.roles))
        .bind(&user.password_hash)
        .bind(user.department.as_str())
        .bind(user.enabled)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(e, "inserting user"))?;

        Ok(())
    }

    #[instrument(name = "user.store.update", skip_all)]
    async fn update(&self, user: &User) -> Result<(), UserError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                email = $3,
                roles = $4,
                password_hash = $5,
                department = $6,
                enabled = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(Role::to_strings(&user.roles))
        .bind(&user.password_hash)
        .bind(user.department.as_str())
        .bind(user.enabled)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(e, "updating user"))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }

        Ok(())
    }

    #[instrument(name = "user.store.delete", skip_all)]
    async fn delete(&self, user: &User) -> Result<(), UserError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(e, "deleting user"))?;

        Ok(())
    }

    #[instrument(name = "user.store.query", skip_all)]
    async fn query(
        &self,
        filter: &QueryFilter,
        order: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> Result<Vec<User>, UserError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(order.field.column())
            .push(" ")
            .push(order.direction.as_sql());
        qb.push(" OFFSET ")
            .push_bind(page.offset())
            .push(" ROWS FETCH NEXT ")
            .push_bind(page.rows())
            .push(" ROWS ONLY");

        let rows: Vec<UserRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error(e, "querying users"))?;

        rows.into_iter().map(User::try_from).collect()
    }

    #[instrument(name = "user.store.count", skip_all)]
    async fn count(&self, filter: &QueryFilter) -> Result<i64, UserError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut qb, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(e, "counting users"))
    }

    #[instrument(name = "user.store.query_by_id", skip(self))]
    async fn query_by_id(&self, id: Uuid) -> Result<User, UserError> {
        let row: UserRow =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_error(e, "selecting user by id"))?;

        row.try_into()
    }

    #[instrument(name = "user.store.query_by_email", skip_all)]
    async fn query_by_email(&self, email: &str) -> Result<User, UserError> {
        let row: UserRow =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_error(e, "selecting user by email"))?;

        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::users::bus::UserBus;
    use roster_core::Direction;
    use roster_models::{Department, NewUser, UpdateUser};
    use std::sync::Arc;

    fn bus(pool: PgPool) -> UserBus {
        UserBus::new(Arc::new(PgUserStore::new(pool))).with_bcrypt_cost(4)
    }

    fn new_user(name: &str, email: &str, roles: Vec<Role>, department: Department) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            roles,
            department,
            password: "gophers123".to_string(),
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Alex"), "Alex");
        assert_eq!(escape_like("100%_sure"), r"100\%\_sure");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
    }

    #[test]
    fn test_name_filter_uses_escape_clause() {
        let filter = QueryFilter {
            name: Some("50%".to_string()),
            ..QueryFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM users");
        push_filter(&mut qb, &filter);
        assert_eq!(qb.sql(), r"SELECT 1 FROM users WHERE name LIKE $1 ESCAPE '\'");
    }

    #[ignore = "requires DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_name_filter_treats_wildcards_literally(pool: PgPool) {
        let bus = bus(pool);
        for (name, email) in [("Ann_Lee", "ann@example.com"), ("AnnxLee", "annx@example.com")] {
            bus.create(new_user(name, email, vec![Role::User], Department::Sales))
                .await
                .unwrap();
        }

        let filter = QueryFilter {
            name: Some("Ann_".to_string()),
            ..QueryFilter::default()
        };
        assert_eq!(bus.count(&filter).await.unwrap(), 1);
    }

    #[ignore = "requires DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_crud(pool: PgPool) {
        let bus = bus(pool);
        let created = bus
            .create(new_user("Alex Doe", "alex@example.com", vec![Role::User], Department::Sales))
            .await
            .unwrap();

        let fetched = bus.query_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);

        let updated = bus
            .update(fetched, UpdateUser::roles(vec![Role::Admin, Role::User]))
            .await
            .unwrap();
        assert_eq!(
            bus.query_by_email("alex@example.com").await.unwrap().roles,
            updated.roles
        );

        bus.delete(&updated).await.unwrap();
        assert!(matches!(
            bus.query_by_id(created.id).await,
            Err(UserError::NotFound)
        ));
    }

    #[ignore = "requires DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_email(pool: PgPool) {
        let bus = bus(pool);
        let nu = new_user("Alex Doe", "alex@example.com", vec![Role::User], Department::Sales);
        bus.create(nu.clone()).await.unwrap();

        assert!(matches!(bus.create(nu).await, Err(UserError::DuplicatedEmail)));
    }

    #[ignore = "requires DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_query_roles_and_order(pool: PgPool) {
        let bus = bus(pool);
        for (name, roles, department) in [
            ("Alex Doe", vec![Role::Admin, Role::User], Department::Sales),
            ("Bob Doe", vec![Role::Admin], Department::Sales),
            ("Will Doe", vec![Role::User], Department::Marketing),
            ("Zack Doe", vec![Role::User], Department::Marketing),
        ] {
            let email = format!("{}@example.com", name.split(' ').next().unwrap().to_lowercase());
            bus.create(new_user(name, &email, roles, department)).await.unwrap();
        }

        let admins = QueryFilter {
            roles: Some(vec![Role::Admin]),
            ..QueryFilter::default()
        };
        assert_eq!(bus.count(&admins).await.unwrap(), 2);

        let everyone = QueryFilter {
            roles: Some(vec![Role::Admin, Role::User]),
            ..QueryFilter::default()
        };
        let order = OrderBy::new(UserOrderField::Name, Direction::Desc);
        let page = Page::new(1, 1).unwrap();
        let users = bus.query(&everyone, &order, &page).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Zack Doe");

        let marketing = QueryFilter {
            department: Some(Department::Marketing),
            name: Some("Will".to_string()),
            ..QueryFilter::default()
        };
        assert_eq!(bus.count(&marketing).await.unwrap(), 1);
    }
}
