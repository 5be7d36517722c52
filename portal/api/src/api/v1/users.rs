use common::http::ext::{RequestGlobalExt, ResultExt};
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::auth::{self, AuthError};
use crate::api::error::Result;
use crate::global::GlobalState;

/// GET /v1/me
///
/// Who the session belongs to. Renews the session like any authenticated
/// call.
pub async fn me(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    let principal = auth::auth_principal(&global, &req).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "id": principal.id.to_string(),
            "username": principal.username,
            "role": principal.kind,
        })
    ))
}

/// GET /v1/users
///
/// Admin-only directory listing.
pub async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    let principal = auth::auth_principal(&global, &req).await?;

    if !principal.kind.is_admin() {
        return Err(AuthError::Forbidden.into());
    }

    let users = global
        .user_store
        .list()
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to list users"))?;

    let users: Vec<serde_json::Value> = users
        .iter()
        .map(|user| {
            json!({
                "id": user.id.to_string(),
                "username": user.username,
                "display_name": user.display_name,
                "role": user.kind,
            })
        })
        .collect();

    Ok(make_response!(StatusCode::OK, json!({ "users": users })))
}
