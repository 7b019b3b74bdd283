//! # tagger-core: Pure Domain Logic for Tagger
//!
//! Everything here is deterministic: no database, no network, no clock.
//! Callers hand in `now` wherever time matters, which is what makes the
//! session expiry rules testable to the millisecond.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tagger Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Desktop page  ◄──── WebSocket hub ────►  Phone page     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/station                                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tagger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │  session  │  │ validation│                  │   │
//! │  │   │  Record   │  │  Session  │  │  barcode  │                  │   │
//! │  │   │ Provenance│  │  events   │  │  timeout  │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product record, provenance, user, shop, article snapshot
//! - [`session`] - Single-slot login state with a sliding deadline
//! - [`validation`] - Barcode checks and loose-input coercion
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use tagger_core::session::Session;
//! use tagger_core::types::User;
//!
//! let mut session = Session::new(30);
//! let now = Utc::now();
//! session.login(User::new(7, "Alex", "04A1B2"), now);
//!
//! // Still logged in one minute before the deadline
//! let (status, event) = session.status(now + Duration::minutes(29));
//! assert_eq!(status.user_id, Some(7));
//! assert!(event.is_none());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use session::{Session, SessionEvent, SessionStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for the session timeout (8 hours, one shift).
pub const MAX_SESSION_TIMEOUT_MINUTES: u32 = 480;

/// Session timeout applied until someone changes it.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u32 = 30;
