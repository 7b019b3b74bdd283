//! # API Error Type
//!
//! What a page sees when a command fails.
//!
//! ```text
//! ValidationError ─┐                       400 VALIDATION_ERROR
//! JsonRejection ───┤                       404 NOT_FOUND
//! DbError ─────────┼──► ApiError ──► JSON  500 DATABASE_ERROR
//! SyncError ───────┘                       500 IMAGE_ERROR / INTERNAL
//!
//! { "ok": false, "code": "VALIDATION_ERROR", "message": "missing identifier" }
//! ```
//!
//! Storage details are logged here and replaced by a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use tagger_core::ValidationError;
use tagger_db::DbError;
use tagger_sync::SyncError;

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    DatabaseError,
    /// A photo could not be decoded or written.
    ImageError,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError | ErrorCode::ImageError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    ok: bool,
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            code: self.code,
            message: &self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!(error = %e, "Database query failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::InvalidPayload(e) => ApiError::validation(format!("Invalid image payload: {}", e)),
            DbError::ImageIo(e) => {
                error!(error = %e, "Image write failed");
                ApiError::new(ErrorCode::ImageError, "Image could not be stored")
            }
            DbError::ImageEncode(e) => {
                error!(error = %e, "Image encoding failed");
                ApiError::new(ErrorCode::ImageError, "Image could not be stored")
            }
            DbError::Internal(e) => {
                error!(error = %e, "Internal database error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::DatabaseError(e) => {
                error!(error = %e, "Database error in session call");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            other => {
                error!(error = %other, "Hub error");
                ApiError::internal("Internal error")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = ValidationError::missing_identifier().into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "missing identifier");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_query_failure_is_generic() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }
}
