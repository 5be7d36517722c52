use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::{Principal, Session, SessionId, Ulid, User};

use super::{SessionStore, StoreError, UserStore};

/// In-memory store for local development and tests. Enabled with
/// `database.uri = "memory"`, nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    users: Mutex<HashMap<Ulid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| StoreError::Unavailable("user table lock poisoned"))?;

        users.insert(user.id, user);

        Ok(())
    }

    /// Raw session row, bypassing the liveness filter. Test introspection
    /// only.
    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.sessions.lock().ok()?.get(&id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(
        &self,
        user_id: Ulid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session table lock poisoned"))?;

        let now = Utc::now();
        let session = Session {
            id: SessionId::generate(),
            user_id,
            expires_at,
            last_used_at: now,
            created_at: now,
        };

        sessions.insert(session.id, session.clone());

        Ok(session)
    }

    async fn find_live_by_id(&self, id: SessionId) -> Result<Option<Principal>, StoreError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session table lock poisoned"))?;

        let Some(session) = sessions.get(&id) else {
            return Ok(None);
        };

        if !session.is_live() {
            return Ok(None);
        }

        let users = self
            .users
            .lock()
            .map_err(|_| StoreError::Unavailable("user table lock poisoned"))?;

        Ok(users.get(&session.user_id).map(User::principal))
    }

    async fn extend_expiry(
        &self,
        id: SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session table lock poisoned"))?;

        if let Some(session) = sessions.get_mut(&id) {
            session.expires_at = expires_at;
            session.last_used_at = Utc::now();
        }

        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session table lock poisoned"))?;

        sessions.remove(&id);

        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self
            .users
            .lock()
            .map_err(|_| StoreError::Unavailable("user table lock poisoned"))?;

        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self
            .users
            .lock()
            .map_err(|_| StoreError::Unavailable("user table lock poisoned"))?;

        let mut users: Vec<User> = users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(users)
    }
}
