use std::sync::Arc;

use common::http::RouteError;
use hyper::{Body, Request, StatusCode};

use crate::api::cookie;
use crate::api::error::ApiError;
use crate::database::Principal;
use crate::global::GlobalState;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
    /// The request has no session cookie at all.
    #[error("not logged in")]
    NotLoggedIn,
    /// The cookie is there but the session it names is expired, deleted or
    /// malformed.
    #[error("session invalid")]
    SessionInvalid,
    #[error("forbidden")]
    Forbidden,
    #[error("session store unavailable")]
    StoreUnavailable,
}

impl From<AuthError> for RouteError<ApiError> {
    #[track_caller]
    fn from(value: AuthError) -> Self {
        let status = match value {
            AuthError::NotLoggedIn | AuthError::SessionInvalid => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };

        RouteError::from((status, value.to_string())).with_source(Some(ApiError::Auth(value)))
    }
}

/// Resolves the request to a logged-in principal, renewing the session as a
/// side effect. Every API route that needs an identity goes through here,
/// regardless of what the page gate already let in.
///
/// A store failure is [`AuthError::StoreUnavailable`], never a pass.
pub async fn auth_principal(
    global: &Arc<GlobalState>,
    req: &Request<Body>,
) -> Result<Principal, AuthError> {
    if !cookie::has_session_cookie(&global.config.session, req) {
        return Err(AuthError::NotLoggedIn);
    }

    let session_id = cookie::session_id_from_request(&global.config.session, req);

    match global.sessions.validate_and_renew(session_id).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => Err(AuthError::SessionInvalid),
        Err(err) => {
            tracing::error!(error = %err, "session store failure during auth");
            Err(AuthError::StoreUnavailable)
        }
    }
}
