pub use common::database::Ulid;

mod session;
mod user;

pub use session::{Session, SessionId};
pub use user::{Principal, User, UserKind};
