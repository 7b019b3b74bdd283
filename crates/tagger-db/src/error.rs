//! # Storage Errors
//!
//! One error type for both stores: SQL rows and image files on disk.
//!
//! ```text
//! sqlx::Error ─────────┐
//! MigrateError ────────┤
//! io::Error ───────────┼──► DbError ──► ApiError (HTTP) / error frame (hub)
//! base64 DecodeError ──┤
//! image::ImageError ───┘
//! ```
//!
//! Barcode lookups never produce `NotFound`; an unknown barcode is `Ok(None)`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique column already holds the value (RFID tag, shop code).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement failure, CHECK constraints included.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Base64 that does not decode.
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("Image storage failed: {0}")]
    ImageIo(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                // "UNIQUE constraint failed: shops.code" or "...: index 'idx_users_rfid_uid'"
                let field = db_err
                    .message()
                    .rsplit(": ")
                    .next()
                    .unwrap_or("unknown")
                    .to_string();
                DbError::UniqueViolation {
                    field,
                    value: "?".to_string(),
                }
            }
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<base64::DecodeError> for DbError {
    fn from(err: base64::DecodeError) -> Self {
        DbError::InvalidPayload(err.to_string())
    }
}

impl From<image::ImageError> for DbError {
    fn from(err: image::ImageError) -> Self {
        DbError::ImageEncode(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_duplicate_tag_is_unique_violation() {
        let users = Database::new(DbConfig::in_memory()).await.unwrap().users();
        users.insert("Alex", "04A1B2C3").await.unwrap();

        match users.insert("Sam", "04A1B2C3").await {
            Err(DbError::UniqueViolation { field, .. }) => assert!(field.contains("rfid_uid")),
            other => panic!("expected unique violation, got {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(DbError::not_found("Product", "123").to_string(), "Product not found: 123");
        assert_eq!(
            DbError::InvalidPayload("bad".into()).to_string(),
            "Invalid image payload: bad"
        );
    }
}
