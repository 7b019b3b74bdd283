//! # User Repository
//!
//! Resolves RFID tags to users. The `users` table belongs to an external
//! directory; only the seed binary writes to it.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tagger_core::User;

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    rfid_uid: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::new(row.id, row.name, row.rfid_uid)
    }
}

/// Repository for users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Finds the user owning an RFID tag.
    ///
    /// The tag is trimmed and matched case-insensitively. A blank tag
    /// matches nobody.
    pub async fn find_by_tag(&self, tag: &str) -> DbResult<Option<User>> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(None);
        }

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, rfid_uid FROM users WHERE LOWER(rfid_uid) = LOWER(?1)",
        )
        .bind(tag)
        .fetch_optional(&self.pool)
        .await?
        .map(User::from);

        debug!(tag = %tag, found = user.is_some(), "Resolved RFID tag");
        Ok(user)
    }

    /// Adds a user. Development seeding only.
    pub async fn insert(&self, name: &str, rfid_uid: &str) -> DbResult<User> {
        let id = sqlx::query("INSERT INTO users (name, rfid_uid) VALUES (?1, ?2)")
            .bind(name)
            .bind(rfid_uid)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(User::new(id, name, rfid_uid))
    }

    /// Counts users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
