//! Bearer-session store.
//!
//! Sessions carry only the resolved access context. The policy is rebuilt
//! from it on every request, so nothing derived from it can go stale.

use aicp_core::AccessContext;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid token")]
    Unknown,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub context: AccessContext,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }
}

/// Token-keyed sessions with an inactivity timeout.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::new(Duration::hours(hours as i64))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn create(&self, context: AccessContext) -> Session {
        self.create_at(context, Utc::now())
    }

    pub fn create_at(&self, context: AccessContext, now: DateTime<Utc>) -> Session {
        let session = Session {
            token: Uuid::new_v4().to_string(),
            context,
            created_at: now,
            last_activity: now,
        };
        self.write().insert(session.token.clone(), session.clone());
        tracing::debug!(user_id = session.context.user_id, "session created");
        session
    }

    /// Read a session without refreshing its activity.
    pub fn get(&self, token: &str) -> Option<Session> {
        self.read().get(token).cloned()
    }

    /// Look up a live session and mark it active. Expired sessions are
    /// removed on sight.
    pub fn touch(&self, token: &str) -> Result<Session, SessionError> {
        self.touch_at(token, Utc::now())
    }

    pub fn touch_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let mut sessions = self.write();
        let session = sessions.get_mut(token).ok_or(SessionError::Unknown)?;
        if session.is_expired(now, self.ttl) {
            sessions.remove(token);
            return Err(SessionError::Expired);
        }
        session.last_activity = now;
        Ok(session.clone())
    }

    pub fn invalidate(&self, token: &str) -> bool {
        self.write().remove(token).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "purged expired sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all sessions, oldest first.
    pub fn list(&self) -> Vec<Session> {
        let mut all: Vec<Session> = self.read().values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        all
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_resolvable() {
        let store = SessionStore::with_ttl_hours(24);
        let a = store.create(AccessContext::doctor(1, "Dr A", 5));
        let b = store.create(AccessContext::admin(2, "Root"));
        assert_ne!(a.token, b.token);
        assert_eq!(store.len(), 2);
        assert_eq!(store.touch(&a.token).unwrap().context.doctor_id, Some(5));
        assert_eq!(store.touch("nope").unwrap_err(), SessionError::Unknown);
        assert_eq!(store.get(&b.token).unwrap().context.user_id, 2);
    }

    #[test]
    fn inactivity_expires_sessions() {
        let store = SessionStore::with_ttl_hours(24);
        let start = Utc::now();
        let s = store.create_at(AccessContext::pharmacy(3, "Ph", 2), start);

        let later = start + Duration::hours(23);
        assert!(store.touch_at(&s.token, later).is_ok());
        // Activity at `later` keeps it alive past the original deadline.
        assert!(store.touch_at(&s.token, later + Duration::hours(23)).is_ok());

        let stale = later + Duration::hours(48);
        assert_eq!(store.touch_at(&s.token, stale).unwrap_err(), SessionError::Expired);
        assert!(store.is_empty());
        assert_eq!(store.touch_at(&s.token, stale).unwrap_err(), SessionError::Unknown);
    }

    #[test]
    fn purge_and_invalidate() {
        let store = SessionStore::with_ttl_hours(1);
        let start = Utc::now();
        let old = store.create_at(AccessContext::admin(1, "a"), start);
        let fresh = store.create_at(AccessContext::admin(2, "b"), start + Duration::hours(2));

        assert_eq!(store.purge_expired_at(start + Duration::minutes(150)), 1);
        assert!(!store.invalidate(&old.token));
        assert!(store.invalidate(&fresh.token));
        assert!(store.is_empty());
    }
}
