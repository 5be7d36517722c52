use std::sync::Arc;

use common::http::ext::RequestGlobalExt;
use common::http::RouteError;
use hyper::http::header;
use hyper::{Body, Response, StatusCode};
use routerify::Middleware;

use crate::api::cookie;
use crate::api::error::ApiError;
use crate::global::GlobalState;

/// Page gate for `path`. Checks only that a session cookie exists, no store
/// access, so a stale cookie still renders the page shell and the first API
/// call from it settles the question. Requests without a cookie are bounced
/// to the login page.
pub fn gate_middleware(
    _: &Arc<GlobalState>,
    path: &str,
) -> Middleware<Body, RouteError<ApiError>> {
    Middleware::pre_with_path(path, |req| async move {
        let global = req.get_global::<GlobalState>()?;

        if cookie::has_session_cookie(&global.config.session, &req) {
            return Ok(req);
        }

        Err(Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, "/login")
            .body(Body::empty())
            .expect("failed to build redirect response")
            .into())
    })
    .expect("failed to build gate middleware")
}
