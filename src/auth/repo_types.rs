use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Column value marking a password that was never hashed.
pub(crate) const LEGACY_SENTINEL: &str = "temp";

/// Stored password state of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Seeded account whose password has not been hashed yet.
    Unmigrated,
    /// bcrypt hash.
    Hashed(String),
}

impl Credential {
    pub(crate) fn from_column(value: String) -> Self {
        if value == LEGACY_SENTINEL {
            Credential::Unmigrated
        } else {
            Credential::Hashed(value)
        }
    }
}

/// Account role. Known roles get their own variant, anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Professor,
    Student,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => Role::Admin,
            "professor" => Role::Professor,
            "student" => Role::Student,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Professor => f.write_str("professor"),
            Role::Student => f.write_str("student"),
            Role::Other(other) => f.write_str(other),
        }
    }
}

/// User record in the credential store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub credential: Credential,
    pub is_active: bool,
    pub last_login: Option<OffsetDateTime>,
}

/// Fields needed to create an account. The email is already normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Raw `users` row as read by sqlx.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub password_hash: String,
    pub is_active: bool,
    pub last_login: Option<OffsetDateTime>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: Role::from(row.role),
            credential: Credential::from_column(row.password_hash),
            is_active: row.is_active,
            last_login: row.last_login,
        }
    }
}
