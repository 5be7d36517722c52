use common::http::ext::{RequestGlobalExt, ResultExt};
use common::make_response;
use hyper::http::header;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::cookie;
use crate::api::error::Result;
use crate::global::GlobalState;

#[derive(serde::Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// POST /v1/login
///
/// Verifies credentials and opens a session, setting the session cookie on
/// the response. Unknown usernames and wrong passwords share one answer.
pub async fn login(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err_route((StatusCode::BAD_REQUEST, "failed to read body"))?;

    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err_route((StatusCode::BAD_REQUEST, "invalid request body"))?;

    let outcome = global
        .sessions
        .login(&request.username, &request.password)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to log in"))?;

    let Some((session, principal)) = outcome else {
        return Ok(make_response!(
            StatusCode::UNAUTHORIZED,
            json!({ "ok": false, "message": "invalid credentials" })
        ));
    };

    tracing::info!(user = %principal.username, "user logged in");

    let mut response = make_response!(
        StatusCode::OK,
        json!({
            "ok": true,
            "redirect": principal.kind.home_path(),
            "role": principal.kind,
            "user": {
                "id": principal.id.to_string(),
                "username": principal.username,
            },
        })
    );

    let cookie = cookie::session_cookie(&global.config.session, session.id);
    response.headers_mut().insert(
        header::SET_COOKIE,
        header::HeaderValue::from_str(&cookie.to_string())
            .map_ignore_err_route("failed to encode session cookie")?,
    );

    Ok(response)
}

/// POST /v1/logout
///
/// Deletes the session row and clears the cookie. Always succeeds: logging
/// out with no cookie, a stale cookie or a dead store still comes back `200`
/// with the cookie cleared.
pub async fn logout(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    let session_id = cookie::session_id_from_request(&global.config.session, &req);

    if let Err(err) = global.sessions.logout(session_id).await {
        // The cookie is cleared regardless, the row expires on its own.
        tracing::error!(error = %err, "failed to delete session on logout");
    }

    let mut response = make_response!(StatusCode::OK, json!({ "ok": true }));

    let cookie = cookie::clear_session_cookie(&global.config.session);
    response.headers_mut().insert(
        header::SET_COOKIE,
        header::HeaderValue::from_str(&cookie.to_string())
            .map_ignore_err_route("failed to encode session cookie")?,
    );

    Ok(response)
}

/// GET /v1/session
///
/// The authoritative probe polled by the client keepalive. `200` renews the
/// session as a side effect, `401` tells the client the session is gone for
/// sure, `500` means the answer is unknown. Never sets a cookie.
pub async fn session(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    let session_id = cookie::session_id_from_request(&global.config.session, &req);

    match global.sessions.validate_and_renew(session_id).await {
        Ok(Some(principal)) => Ok(make_response!(
            StatusCode::OK,
            json!({
                "valid": true,
                "role": principal.kind,
                "user": {
                    "id": principal.id.to_string(),
                    "username": principal.username,
                },
            })
        )),
        Ok(None) => Ok(make_response!(
            StatusCode::UNAUTHORIZED,
            json!({ "valid": false })
        )),
        Err(err) => {
            tracing::error!(error = %err, "session store failure during validation");
            Ok(make_response!(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "valid": false })
            ))
        }
    }
}
