use cookie::{Cookie, SameSite};
use hyper::http::header;
use hyper::{Body, Request};

use crate::config::SessionConfig;
use crate::database::SessionId;

/// Builds the session cookie set on login. No `Max-Age` and no `Expires`:
/// the server decides when a session stops being honored, the browser only
/// holds the id.
pub fn session_cookie(config: &SessionConfig, id: SessionId) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.cookie_name.clone(), id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(config.secure_cookie);
    cookie
}

/// Builds the expired cookie set on logout so the browser drops its copy.
pub fn clear_session_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.cookie_name.clone(), "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(config.secure_cookie);
    cookie.set_max_age(cookie::time::Duration::ZERO);
    cookie.set_expires(cookie::time::OffsetDateTime::UNIX_EPOCH);
    cookie
}

/// True if the request carries a non-empty session cookie. Presence only,
/// nothing here says the session is still live.
pub fn has_session_cookie(config: &SessionConfig, req: &Request<Body>) -> bool {
    let Some(header) = req.headers().get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    Cookie::split_parse(header)
        .filter_map(|cookie| cookie.ok())
        .any(|cookie| cookie.name() == config.cookie_name && !cookie.value().is_empty())
}

/// Extracts the session id from the request, if the cookie is present and
/// parses as one.
pub fn session_id_from_request(config: &SessionConfig, req: &Request<Body>) -> Option<SessionId> {
    let header = req.headers().get(header::COOKIE)?.to_str().ok()?;

    Cookie::split_parse(header)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == config.cookie_name)
        .and_then(|cookie| SessionId::from_cookie(cookie.value()))
}
