use std::sync::Arc;

use common::http::RouteError;
use hyper::Body;
use routerify::Router;

use super::error::ApiError;
use crate::global::GlobalState;

pub mod auth;
pub mod health;
pub mod users;

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .post("/login", auth::login)
        .post("/logout", auth::logout)
        .get("/session", auth::session)
        .get("/me", users::me)
        .get("/users", users::list)
        .get("/health", health::health)
        .build()
        .expect("failed to build router")
}
