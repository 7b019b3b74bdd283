//! # Error Types
//!
//! Domain-specific error types for tagger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tagger-core errors (this file)                                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tagger-db errors     └── DbError     - storage + image artifacts      │
//! │  tagger-lookup errors └── LookupError - one remote provider call       │
//! │  tagger-sync errors   └── SyncError   - hub lifecycle and transport    │
//! │  station errors       └── ApiError    - what the pages see (JSON)      │
//! │                                                                         │
//! │  Flow: ValidationError ───────────────► ApiError → Frontend            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Absence is never an error in this system: a missing record or a remote
//! miss is an empty result, not an error.

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything touches the store.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The barcode was empty after trimming.
    #[error("missing identifier")]
    MissingIdentifier,

    /// Numeric value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., NaN quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// The barcode was empty after trimming.
    pub fn missing_identifier() -> Self {
        ValidationError::MissingIdentifier
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::missing_identifier().to_string(), "missing identifier");

        let err = ValidationError::InvalidFormat {
            field: "qty".to_string(),
            reason: "must be a finite number".to_string(),
        };
        assert_eq!(err.to_string(), "qty has invalid format: must be a finite number");

        let err = ValidationError::Negative {
            field: "qty".to_string(),
        };
        assert_eq!(err.to_string(), "qty must not be negative");
    }
}
