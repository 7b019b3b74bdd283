//! # Session
//!
//! The single logged-in-user slot with a sliding deadline.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │             login(user)                                                 │
//! │   ┌──────────┐ ─────────► ┌───────────────────────────────┐            │
//! │   │ No user  │            │ User set                      │            │
//! │   │          │ ◄───────── │ expires_at = now + timeout    │            │
//! │   └──────────┘  logout()  │ (None when timeout == 0)      │            │
//! │        ▲        or expiry └───────────────────────────────┘            │
//! │        │                                                                │
//! │        └── logout() on an empty slot is still a Logout event           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expiry Is Lazy
//! Nothing watches the deadline. Expiry is detected only when someone asks
//! for the status (`status()`), so a session past its deadline still looks
//! logged in to any code that reads the slot without asking (`peek()`).
//! The pages poll status every few seconds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::User;
use crate::validation::clamp_timeout_minutes;

// =============================================================================
// Session Events
// =============================================================================

/// What happened to the slot. The caller decides how to publish it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user logged in.
    Login { user_id: i64, user_name: String },
    /// The slot was cleared. Carries the previous occupant, if any.
    Logout {
        prev_user_id: Option<i64>,
        prev_user_name: String,
    },
}

// =============================================================================
// Session Status
// =============================================================================

/// Snapshot returned to the pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionStatus {
    pub user_id: Option<i64>,
    pub user_name: String,
    pub timeout_minutes: u32,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionUser {
    id: i64,
    name: String,
}

/// Single-slot authentication state.
///
/// Pure: every method that depends on time takes `now`.
#[derive(Debug, Clone)]
pub struct Session {
    user: Option<SessionUser>,
    timeout_minutes: u32,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates an empty session. The timeout is clamped like `set_timeout`.
    pub fn new(timeout_minutes: u32) -> Self {
        Session {
            user: None,
            timeout_minutes: clamp_timeout_minutes(timeout_minutes as i64),
            expires_at: None,
        }
    }

    /// Puts `user` into the slot, replacing whoever was there.
    pub fn login(&mut self, user: User, now: DateTime<Utc>) -> SessionEvent {
        self.expires_at = self.deadline_from(now);
        let event = SessionEvent::Login {
            user_id: user.id,
            user_name: user.name.clone(),
        };
        self.user = Some(SessionUser {
            id: user.id,
            name: user.name,
        });
        event
    }

    /// Clears the slot unconditionally.
    pub fn logout(&mut self) -> SessionEvent {
        let prev = self.user.take();
        self.expires_at = None;
        SessionEvent::Logout {
            prev_user_id: prev.as_ref().map(|u| u.id),
            prev_user_name: prev.map(|u| u.name).unwrap_or_default(),
        }
    }

    /// Clears the slot if its deadline has passed.
    ///
    /// Returns the same event `logout()` would.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> Option<SessionEvent> {
        match (&self.user, self.expires_at) {
            (Some(_), Some(deadline)) if now >= deadline => Some(self.logout()),
            _ => None,
        }
    }

    /// Applies the expiry check, then reports the slot.
    pub fn status(&mut self, now: DateTime<Utc>) -> (SessionStatus, Option<SessionEvent>) {
        let event = self.expire_if_due(now);
        (self.peek(), event)
    }

    /// Reports the slot without the expiry check.
    ///
    /// Used by writers that only need attribution (e.g. saving a record);
    /// may return a user whose deadline already passed.
    pub fn peek(&self) -> SessionStatus {
        SessionStatus {
            user_id: self.user.as_ref().map(|u| u.id),
            user_name: self.user.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
            timeout_minutes: self.timeout_minutes,
            expires_at: self.expires_at,
        }
    }

    /// Changes the timeout and returns the value actually applied.
    ///
    /// With a user logged in, a nonzero timeout restarts the deadline from
    /// `now`; zero makes the session non-expiring.
    pub fn set_timeout(&mut self, minutes: i64, now: DateTime<Utc>) -> u32 {
        self.timeout_minutes = clamp_timeout_minutes(minutes);
        if self.user.is_some() {
            self.expires_at = self.deadline_from(now);
        }
        self.timeout_minutes
    }

    pub fn timeout_minutes(&self) -> u32 {
        self.timeout_minutes
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    fn deadline_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.timeout_minutes > 0).then(|| now + Duration::minutes(self.timeout_minutes as i64))
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(crate::DEFAULT_SESSION_TIMEOUT_MINUTES)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn alex() -> User {
        User::new(7, "Alex", "04A1B2C3")
    }

    #[test]
    fn test_login_sets_deadline() {
        let mut session = Session::new(30);
        let now = Utc::now();

        let event = session.login(alex(), now);
        assert_eq!(
            event,
            SessionEvent::Login {
                user_id: 7,
                user_name: "Alex".to_string()
            }
        );

        let status = session.peek();
        assert_eq!(status.user_id, Some(7));
        assert_eq!(status.expires_at, Some(now + Duration::minutes(30)));
    }

    #[test]
    fn test_zero_timeout_never_expires() {
        let mut session = Session::new(0);
        let now = Utc::now();
        session.login(alex(), now);

        let (status, event) = session.status(now + Duration::days(365));
        assert!(status.is_logged_in());
        assert!(status.expires_at.is_none());
        assert!(event.is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let timeout = 30;
        let epsilon = Duration::seconds(1);

        let now = Utc::now();
        let deadline = now + Duration::minutes(timeout);

        let mut session = Session::new(timeout as u32);
        session.login(alex(), now);

        // T - ε: still logged in
        let (status, event) = session.status(deadline - epsilon);
        assert!(status.is_logged_in());
        assert!(event.is_none());

        // T + ε: logged out, with the pre-expiry user on the event
        let (status, event) = session.status(deadline + epsilon);
        assert!(!status.is_logged_in());
        assert_eq!(
            event,
            Some(SessionEvent::Logout {
                prev_user_id: Some(7),
                prev_user_name: "Alex".to_string()
            })
        );

        // The event fires once
        let (_, event) = session.status(deadline + epsilon * 2);
        assert!(event.is_none());
    }

    #[test]
    fn test_expiry_at_exact_deadline() {
        let now = Utc::now();
        let mut session = Session::new(1);
        session.login(alex(), now);

        let (status, event) = session.status(now + Duration::minutes(1));
        assert!(!status.is_logged_in());
        assert!(event.is_some());
    }

    #[test]
    fn test_peek_does_not_expire() {
        let now = Utc::now();
        let mut session = Session::new(1);
        session.login(alex(), now);

        let later = now + Duration::hours(1);
        assert!(session.peek().is_logged_in());
        assert!(session.status(later).1.is_some());
    }

    #[test]
    fn test_logout_without_user() {
        let mut session = Session::default();
        assert_eq!(
            session.logout(),
            SessionEvent::Logout {
                prev_user_id: None,
                prev_user_name: String::new()
            }
        );
    }

    #[test]
    fn test_set_timeout_clamps_and_restarts_deadline() {
        let now = Utc::now();
        let mut session = Session::new(30);

        assert_eq!(session.set_timeout(-5, now), 0);
        assert_eq!(session.set_timeout(9999, now), 480);

        session.login(alex(), now);
        let later = now + Duration::minutes(10);
        assert_eq!(session.set_timeout(60, later), 60);
        assert_eq!(session.peek().expires_at, Some(later + Duration::minutes(60)));

        assert_eq!(session.set_timeout(0, later), 0);
        assert!(session.peek().expires_at.is_none());
        assert!(session.peek().is_logged_in());
    }

    #[test]
    fn test_set_timeout_without_user_keeps_no_deadline() {
        let now = Utc::now();
        let mut session = Session::new(30);
        session.set_timeout(90, now);
        assert!(session.peek().expires_at.is_none());
        assert_eq!(session.timeout_minutes(), 90);
    }
}
