//! User persistence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::database::{Database, DatabaseError};

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub user_id: i64,
}

/// User fields supplied by a client; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub user_id: i64,
}

impl NewUser {
    fn with_id(self, id: i64) -> User {
        User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            user_id: self.user_id,
        }
    }
}

/// Data access used by the HTTP handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    /// `None` when no row has this id.
    async fn fetch_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    /// `None` when no row has this id.
    async fn update_user(&self, id: i64, user: NewUser) -> Result<Option<User>, DatabaseError>;

    /// Returns the generated id.
    async fn create_user(&self, user: NewUser) -> Result<i64, DatabaseError>;

    /// `false` when no row has this id.
    async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError>;
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT "id", "first_name", "last_name", "role", "user_id" FROM "users" ORDER BY "id""#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT "id", "first_name", "last_name", "role", "user_id"
            FROM "users"
            WHERE "id" = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(&self, id: i64, user: NewUser) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE "users"
            SET "first_name" = $1, "last_name" = $2, "role" = $3, "user_id" = $4
            WHERE "id" = $5
            RETURNING "id", "first_name", "last_name", "role", "user_id"
            "#,
        )
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role)
        .bind(user.user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, DatabaseError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO "users" ("first_name", "last_name", "role", "user_id")
            VALUES ($1, $2, $3, $4)
            RETURNING "id"
            "#,
        )
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role)
        .bind(user.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(r#"DELETE FROM "users" WHERE "id" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Process-local store for development runs and tests.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `users`; new ids continue after the largest one.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users: BTreeMap<i64, User> = users.into_iter().map(|u| (u.id, u)).collect();
        let next_id = users.keys().next_back().copied().unwrap_or(0);
        Self {
            inner: RwLock::new(MemoryInner { next_id, users }),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn update_user(&self, id: i64, user: NewUser) -> Result<Option<User>, DatabaseError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(existing) => {
                *existing = user.with_id(id);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.users.insert(id, user.with_id(id));
        Ok(id)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(first: &str) -> NewUser {
        NewUser {
            first_name: first.into(),
            last_name: "Smith".into(),
            role: "Customer".into(),
            user_id: 1,
        }
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryUserStore::new();

        let id = store.create_user(new_user("Ada")).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.fetch_user(id).await.unwrap().unwrap().first_name, "Ada");

        let updated = store.update_user(id, new_user("Grace")).await.unwrap().unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.first_name, "Grace");

        assert!(store.delete_user(id).await.unwrap());
        assert!(!store.delete_user(id).await.unwrap());
        assert!(store.fetch_user(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_update_missing() {
        let store = MemoryUserStore::new();
        assert!(store.update_user(9, new_user("Ada")).await.unwrap().is_none());
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_ids_continue() {
        let store = MemoryUserStore::with_users([new_user("Ada").with_id(7)]);
        assert_eq!(store.create_user(new_user("Bob")).await.unwrap(), 8);
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }
}
