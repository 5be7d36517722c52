use chrono::{DateTime, Utc};

use super::Ulid;

/// The opaque identifier stored in the browser cookie.
///
/// A v4 uuid, so the client-visible value carries no structure and cannot be
/// guessed or enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parses a cookie value. Empty or malformed values come back as `None`
    /// and are treated exactly like a missing cookie.
    pub fn from_cookie(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        uuid::Uuid::parse_str(value).ok().map(Self)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// The unique identifier for the session, also the cookie value.
    pub id: SessionId,
    /// Foreign key to the user table. The session never owns the user.
    pub user_id: Ulid,
    /// The time past which the session is no longer valid.
    pub expires_at: DateTime<Utc>,
    /// The time the session was last used.
    pub last_used_at: DateTime<Utc>,
    /// The time the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session is live iff its expiry is still in the future. There is no
    /// separate revoked flag, deletion is the only explicit invalidation.
    pub fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}
