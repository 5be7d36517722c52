use std::sync::Arc;

use chrono::Utc;

use crate::database::{Principal, Session, SessionId};
use crate::store::{SessionStore, StoreError, UserStore};

/// Owns the session lifecycle rules. Everything above this (endpoints,
/// middleware) treats sessions as opaque, everything below (stores) only
/// moves rows around.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    ttl: chrono::Duration,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            sessions,
            users,
            ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// The authoritative check. Resolves the session to its principal and
    /// slides the expiry forward to `now + ttl`.
    ///
    /// `None` in means `None` out without touching the store. A store error
    /// propagates so callers fail closed rather than guessing.
    pub async fn validate_and_renew(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Option<Principal>, StoreError> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };

        let Some(principal) = self.sessions.find_live_by_id(session_id).await? else {
            return Ok(None);
        };

        // Renewal is unconditional once the session is known live. The
        // renewed expiry is anchored to now, not to the previous expiry.
        self.sessions
            .extend_expiry(session_id, Utc::now() + self.ttl)
            .await?;

        Ok(Some(principal))
    }

    /// Verifies credentials and opens a session. `Ok(None)` covers both an
    /// unknown username and a wrong password, the caller must not reveal
    /// which.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<(Session, Principal)>, StoreError> {
        let Some(user) = self.users.find_by_username(&username.to_lowercase()).await? else {
            return Ok(None);
        };

        if !user.verify_password(password) {
            return Ok(None);
        }

        let session = self.sessions.create(user.id, Utc::now() + self.ttl).await?;

        Ok(Some((session, user.principal())))
    }

    /// Drops the session row. Absent or malformed ids are fine, logout is
    /// idempotent.
    pub async fn logout(&self, session_id: Option<SessionId>) -> Result<(), StoreError> {
        let Some(session_id) = session_id else {
            return Ok(());
        };

        self.sessions.delete(session_id).await
    }
}
