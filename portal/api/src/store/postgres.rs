use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::{Principal, Session, SessionId, Ulid, User};

use super::{SessionStore, StoreError, UserStore};

/// Postgres-backed store. Schema lives in `schema.sql`.
pub struct PostgresStore {
    db: Arc<sqlx::PgPool>,
}

impl PostgresStore {
    pub fn new(db: Arc<sqlx::PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn create(
        &self,
        user_id: Ulid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let session: Session = sqlx::query_as(
            "INSERT INTO user_sessions (id, user_id, expires_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(SessionId::generate())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(session)
    }

    async fn find_live_by_id(&self, id: SessionId) -> Result<Option<Principal>, StoreError> {
        // Single round trip: the join and the liveness filter happen in the
        // same statement, so a concurrent delete cannot slip between them.
        let principal: Option<Principal> = sqlx::query_as(
            "SELECT u.id, u.username, u.kind FROM user_sessions s INNER JOIN users u ON u.id = s.user_id WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        Ok(principal)
    }

    async fn extend_expiry(
        &self,
        id: SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // rows_affected is not checked, absent rows are a no-op.
        sqlx::query("UPDATE user_sessions SET expires_at = $2, last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(expires_at)
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_sessions WHERE id = $1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.as_ref())
            .await?;

        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username")
            .fetch_all(self.db.as_ref())
            .await?;

        Ok(users)
    }
}
