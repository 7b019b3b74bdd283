//! # Sync Error Types
//!
//! Error types for the hub and the session tracker.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Lifecycle     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  BindFailed     │  │  Serialization          │ │
//! │  │                 │  │  AlreadyStarted │  │                         │ │
//! │  │                 │  │  NotRunning     │  │                         │ │
//! │  │                 │  │  RuntimeFailed  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │                                                   │
//! │  │  DatabaseError  │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid hub configuration.
    #[error("Invalid hub configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Could not bind the listening socket.
    #[error("Failed to bind {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    /// `start` was called twice on the same handle.
    #[error("Hub already started")]
    AlreadyStarted,

    /// The hub is not accepting work.
    #[error("Hub is not running")]
    NotRunning,

    /// The hub thread or its runtime could not be created.
    #[error("Hub runtime failed: {0}")]
    RuntimeFailed(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a message.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<tagger_db::DbError> for SyncError {
    fn from(err: tagger_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::RuntimeFailed(err.to_string())
    }
}
