use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::{Principal, Session, SessionId, Ulid, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(&'static str),
}

/// Durable mapping from session id to (user, expiry).
///
/// Only the session service talks to this; the liveness rule (`expires_at`
/// in the future) is enforced inside `find_live_by_id` so there is exactly
/// one place that defines what a usable session is.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Inserts a session row with a freshly generated id and the given
    /// expiry, returning the full row.
    async fn create(&self, user_id: Ulid, expires_at: DateTime<Utc>)
        -> Result<Session, StoreError>;

    /// Looks up a session and its owning principal in one atomic read.
    /// Expired and absent rows are indistinguishable: both are `None`.
    async fn find_live_by_id(&self, id: SessionId) -> Result<Option<Principal>, StoreError>;

    /// Unconditionally moves the expiry. A missing row is a no-op, not an
    /// error.
    async fn extend_expiry(
        &self,
        id: SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Removes the row. Idempotent.
    async fn delete(&self, id: SessionId) -> Result<(), StoreError>;
}

/// Principal lookups needed by the login flow and the admin listing.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;
}
