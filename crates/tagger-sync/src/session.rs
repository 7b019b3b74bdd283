//! # Session Tracker
//!
//! The shared login slot. Wraps the pure [`Session`] with the user directory
//! and the hub, so every state change also reaches the pages.
//!
//! Called from HTTP handlers and from the RFID thread. The lock is never held
//! across an await: the directory lookup happens first, the slot update after.
//!
//! Expiry stays lazy: it is checked in [`SessionTracker::current_user`] and
//! nowhere else.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::hub::HubHandle;
use crate::protocol::HubMessage;
use tagger_core::{Session, SessionEvent, SessionStatus, User};
use tagger_db::UserRepository;

/// Result of presenting a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn(User),
    NotRecognized,
}

/// Cheap to clone; all clones share one slot.
#[derive(Clone)]
pub struct SessionTracker {
    session: Arc<Mutex<Session>>,
    users: UserRepository,
    hub: HubHandle,
}

impl SessionTracker {
    pub fn new(timeout_minutes: u32, users: UserRepository, hub: HubHandle) -> Self {
        SessionTracker {
            session: Arc::new(Mutex::new(Session::new(timeout_minutes))),
            users,
            hub,
        }
    }

    /// Logs in whoever owns `tag`.
    ///
    /// An unknown tag changes nothing and publishes nothing. Directory
    /// faults are returned to the caller.
    pub async fn login_by_tag(&self, tag: &str) -> SyncResult<LoginOutcome> {
        self.login_by_tag_at(tag, Utc::now()).await
    }

    /// Clears the slot and publishes `user_logout` with whoever was in it.
    pub fn logout(&self) -> SessionEvent {
        let event = self.lock().logout();
        info!("Session logged out");
        self.publish(event.clone());
        event
    }

    /// Applies the expiry check, then reports the slot.
    pub fn current_user(&self) -> SessionStatus {
        self.current_user_at(Utc::now())
    }

    /// Sets the timeout (clamped to `[0, 480]`) and returns the applied value.
    pub fn set_timeout(&self, minutes: i64) -> u32 {
        let applied = self.lock().set_timeout(minutes, Utc::now());
        info!(requested = minutes, applied, "Session timeout changed");
        applied
    }

    /// Current user id for attribution, without the expiry check.
    pub fn peek_user_id(&self) -> Option<i64> {
        self.lock().current_user_id()
    }

    async fn login_by_tag_at(&self, tag: &str, now: DateTime<Utc>) -> SyncResult<LoginOutcome> {
        let Some(user) = self.users.find_by_tag(tag).await? else {
            debug!(tag = %tag.trim(), "Tag not recognized");
            return Ok(LoginOutcome::NotRecognized);
        };

        let event = self.lock().login(user.clone(), now);
        info!(user_id = user.id, user_name = %user.name, "Session logged in");
        self.publish(event);
        Ok(LoginOutcome::LoggedIn(user))
    }

    fn current_user_at(&self, now: DateTime<Utc>) -> SessionStatus {
        let (status, event) = self.lock().status(now);
        if let Some(event) = event {
            info!("Session expired");
            self.publish(event);
        }
        status
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: SessionEvent) {
        self.hub.broadcast_from_anywhere(HubMessage::from(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tagger_db::{Database, DbConfig};

    async fn tracker(timeout: u32) -> SessionTracker {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert("Alex", "04A1B2C3").await.unwrap();
        SessionTracker::new(timeout, db.users(), HubHandle::new())
    }

    #[tokio::test]
    async fn test_login_by_tag() {
        let tracker = tracker(30).await;

        let outcome = tracker.login_by_tag("04a1b2c3").await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LoggedIn(ref user) if user.name == "Alex"));

        let status = tracker.current_user();
        assert_eq!(status.user_name, "Alex");
        assert!(status.expires_at.is_some());
        assert_eq!(tracker.peek_user_id(), status.user_id);
    }

    #[tokio::test]
    async fn test_unknown_tag_changes_nothing() {
        let tracker = tracker(30).await;
        tracker.login_by_tag("04A1B2C3").await.unwrap();

        let outcome = tracker.login_by_tag("DEADBEEF").await.unwrap();
        assert_eq!(outcome, LoginOutcome::NotRecognized);
        assert_eq!(tracker.current_user().user_name, "Alex");
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let tracker = tracker(10).await;
        let start = Utc::now();
        tracker.login_by_tag_at("04A1B2C3", start).await.unwrap();

        let before = tracker.current_user_at(start + Duration::minutes(10) - Duration::seconds(1));
        assert!(before.is_logged_in());

        // Past the deadline but nobody asked yet
        assert!(tracker.peek_user_id().is_some());

        let after = tracker.current_user_at(start + Duration::minutes(10) + Duration::seconds(1));
        assert!(!after.is_logged_in());
        assert_eq!(after.expires_at, None);
        assert!(tracker.peek_user_id().is_none());
    }

    #[tokio::test]
    async fn test_logout_and_timeout() {
        let tracker = tracker(30).await;

        let event = tracker.logout();
        assert_eq!(
            event,
            SessionEvent::Logout {
                prev_user_id: None,
                prev_user_name: String::new(),
            }
        );

        assert_eq!(tracker.set_timeout(-5), 0);
        assert_eq!(tracker.set_timeout(9999), 480);

        tracker.login_by_tag("04A1B2C3").await.unwrap();
        assert_eq!(tracker.set_timeout(0), 0);
        assert_eq!(tracker.current_user().expires_at, None);

        let event = tracker.logout();
        assert!(matches!(event, SessionEvent::Logout { prev_user_name, .. } if prev_user_name == "Alex"));
    }
}
