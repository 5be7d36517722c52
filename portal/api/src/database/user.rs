use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};

use super::Ulid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Ulid,
    /// The username of the user, stored lowercase.
    pub username: String,
    /// The display name of the user.
    pub display_name: String,
    /// The hashed password of the user. (argon2)
    pub password_hash: String,
    /// The coarse account type used for role gating.
    pub kind: UserKind,
    /// The time the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Uses argon2 to verify the password hash against the provided password.
    pub fn verify_password(&self, password: &str) -> bool {
        let hash = match PasswordHash::new(&self.password_hash) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::error!("failed to parse password hash: {}", err);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    }

    /// Generates a new password hash using argon2.
    pub fn hash_password(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("failed to hash password");

        hash.to_string()
    }

    /// The identity fields that cross the session boundary. Everything else
    /// on the row stays server side.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            kind: self.kind,
        }
    }
}

/// The authenticated identity a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Principal {
    pub id: Ulid,
    pub username: String,
    pub kind: UserKind,
}

/// The two-tier account type. Serialized as its numeric code in API
/// responses (the `role` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserKind {
    #[default]
    Staff,
    Admin,
}

impl UserKind {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The landing page for this account type after login.
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Staff => "/",
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Staff => 1,
            Self::Admin => 2,
        }
    }
}

impl From<i16> for UserKind {
    fn from(value: i16) -> Self {
        // Unknown codes fall back to the least privileged kind.
        match value {
            2 => Self::Admin,
            _ => Self::Staff,
        }
    }
}

impl serde::Serialize for UserKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl sqlx::Type<sqlx::Postgres> for UserKind {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Decode<'_, sqlx::Postgres> for UserKind {
    fn decode(
        value: sqlx::postgres::PgValueRef<'_>,
    ) -> Result<Self, Box<dyn std::error::Error + 'static + Send + Sync>> {
        <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value).map(Self::from)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for UserKind {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <i16 as sqlx::Encode<'_, sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}
