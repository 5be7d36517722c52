//! Server-rendered page shells. The portal UI is deliberately plain html,
//! these handlers exist so the cookie gate has pages to protect and the
//! login form has somewhere to live.

use std::sync::Arc;

use common::http::RouteError;
use hyper::http::header;
use hyper::{Body, Request, Response};
use routerify::Router;

use super::error::{ApiError, Result};
use super::middleware;
use crate::global::GlobalState;

const LOGIN_PAGE: &str = include_str!("pages/login.html");
const HOME_PAGE: &str = include_str!("pages/home.html");
const ADMIN_PAGE: &str = include_str!("pages/admin.html");

fn html_response(body: &'static str) -> Response<Body> {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(body))
        .expect("failed to build page response")
}

pub async fn login_page(_: Request<Body>) -> Result<Response<Body>> {
    Ok(html_response(LOGIN_PAGE))
}

async fn home_page(_: Request<Body>) -> Result<Response<Body>> {
    Ok(html_response(HOME_PAGE))
}

async fn admin_page(_: Request<Body>) -> Result<Response<Body>> {
    Ok(html_response(ADMIN_PAGE))
}

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .middleware(middleware::auth::gate_middleware(global, "/"))
        .middleware(middleware::auth::gate_middleware(global, "/admin"))
        .get("/", home_page)
        .get("/admin", admin_page)
        .build()
        .expect("failed to build router")
}
