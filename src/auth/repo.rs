use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{Credential, NewUser, UserRecord, UserRow, LEGACY_SENTINEL};

const USER_COLUMNS: &str = "id, email, full_name, role, password_hash, is_active, last_login";

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Persistent user records keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_active_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>>;

    async fn find_active_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>>;

    async fn list_all(&self) -> anyhow::Result<Vec<UserRecord>>;

    /// Creates an active user. Email uniqueness is enforced atomically by the store.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, InsertError>;

    /// Replaces an unmigrated credential with `hash`.
    /// Returns false when the record is missing or already hashed.
    async fn migrate_credential(&self, id: Uuid, hash: &str) -> anyhow::Result<bool>;

    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_active_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = true"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_active_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = true"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, InsertError> {
        let inserted = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.to_string())
        .fetch_optional(&self.db)
        .await;

        match inserted {
            Ok(Some(row)) => Ok(row.into()),
            Ok(None) => Err(InsertError::EmailTaken),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(InsertError::EmailTaken)
            }
            Err(e) => Err(InsertError::Store(e.into())),
        }
    }

    async fn migrate_credential(&self, id: Uuid, hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1
            WHERE id = $2 AND password_hash = $3
            "#,
        )
        .bind(hash)
        .bind(id)
        .bind(LEGACY_SENTINEL)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// In-process store with the same semantics as [`PgUserStore`].
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active account with an unmigrated credential.
    pub async fn seed_unmigrated(&self, email: &str, full_name: &str, role: &str) -> UserRecord {
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            full_name: full_name.into(),
            role: role.to_string().into(),
            credential: Credential::Unmigrated,
            is_active: true,
            last_login: None,
        };
        self.users.write().await.push(record.clone());
        record
    }

    /// Flips the active flag. Returns false for an unknown id.
    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Looks a record up by id regardless of its active flag.
    pub async fn get(&self, id: Uuid) -> Option<UserRecord> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_active_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email == email && u.is_active)
            .cloned())
    }

    async fn find_active_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id && u.is_active).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, InsertError> {
        // Check and push happen under one write lock.
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(InsertError::EmailTaken);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            credential: Credential::Hashed(user.password_hash),
            is_active: true,
            last_login: None,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn migrate_credential(&self, id: Uuid, hash: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) if user.credential == Credential::Unmigrated => {
                user.credential = Credential::Hashed(hash.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            full_name: "Test User".into(),
            role: Role::Student,
            password_hash: "$2b$10$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.expect("first insert");
        let err = store.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, InsertError::EmailTaken));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn inactive_users_are_invisible_to_lookups() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("b@example.com")).await.unwrap();
        assert!(store.set_active(user.id, false).await);
        assert!(store.find_active_by_email("b@example.com").await.unwrap().is_none());
        assert!(store.find_active_by_id(user.id).await.unwrap().is_none());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn migrate_credential_only_touches_unmigrated() {
        let store = MemoryUserStore::new();
        let seeded = store.seed_unmigrated("c@example.com", "C", "student").await;
        assert!(store.migrate_credential(seeded.id, "$2b$10$first").await.unwrap());
        assert!(!store.migrate_credential(seeded.id, "$2b$10$second").await.unwrap());
        let stored = store.get(seeded.id).await.unwrap();
        assert_eq!(stored.credential, Credential::Hashed("$2b$10$first".into()));
    }

    #[tokio::test]
    async fn touch_last_login_sets_timestamp() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("d@example.com")).await.unwrap();
        assert!(user.last_login.is_none());
        store.touch_last_login(user.id).await.unwrap();
        assert!(store.get(user.id).await.unwrap().last_login.is_some());
    }
}
