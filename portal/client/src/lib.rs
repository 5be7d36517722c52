//! Session keepalive for portal clients.
//!
//! The server is the only authority on whether a session is live. This crate
//! keeps a client honest about it: a [`SessionController`] watches user
//! activity, revalidates the session against the portal API while the user
//! is active, and tells the client to force a fresh login when the session
//! is gone or the user has gone idle.

#![forbid(unsafe_code)]

mod controller;
mod probe;

pub use controller::{
    ActivityHandle, KeepaliveConfig, LogoutReason, SessionController, SessionEvent,
};
pub use probe::{HttpProbe, LoginOutcome, ProbeError, SessionProbe, Verdict, VerdictUser};
