//! Per-user session storage with idle expiry

use crate::models::UserId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct UserSession<T> {
    pub user_id: UserId,
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl<T> UserSession<T> {
    pub fn new(user_id: UserId, data: T) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            data,
            created_at: now,
            last_active: now,
        }
    }

    pub fn update_activity(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        let max_age = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Utc::now() - self.last_active > max_age
    }
}

/// Sessions keyed by user id
///
/// Expired sessions are treated as absent on read and dropped by
/// [`SessionManager::cleanup_expired`].
pub struct SessionManager<T> {
    sessions: Arc<RwLock<HashMap<UserId, UserSession<T>>>>,
    session_ttl: Duration,
}

impl<T: Clone + Send + Sync> SessionManager<T> {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl,
        }
    }

    /// Live session data for `user_id`
    pub async fn get(&self, user_id: UserId) -> Option<T> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&user_id)
            .filter(|s| !s.is_expired(self.session_ttl))
            .map(|s| s.data.clone())
    }

    /// Store `data` for `user_id`, refreshing its activity time
    pub async fn set(&self, user_id: UserId, data: T) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            Some(session) => {
                session.data = data;
                session.update_activity();
            }
            None => {
                sessions.insert(user_id, UserSession::new(user_id, data));
            }
        }
    }

    /// Apply `step` to the live session of `user_id` under the write lock
    ///
    /// `step` returns the next data, or `None` to end the session, along with
    /// a value handed back to the caller. Returns `None` when there is no live
    /// session.
    pub async fn update<R>(
        &self,
        user_id: UserId,
        step: impl FnOnce(T) -> (Option<T>, R),
    ) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&user_id)
            .filter(|s| !s.is_expired(self.session_ttl))?;

        let (next, output) = step(session.data.clone());
        match next {
            Some(data) => {
                session.data = data;
                session.update_activity();
            }
            None => {
                sessions.remove(&user_id);
            }
        }
        Some(output)
    }

    pub async fn delete(&self, user_id: UserId) -> bool {
        self.sessions.write().await.remove(&user_id).is_some()
    }

    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let initial_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.session_ttl));
        initial_count - sessions.len()
    }
}

impl<T> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            session_ttl: self.session_ttl,
        }
    }
}
