use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::{
    auth::{AuthPrincipal, TokenManager, AUTH_HEADER},
    database::PrincipalStore,
    errors::Result,
    models::{CredentialsRequest, Principal, PrincipalResponse, TokenBinding},
};

fn with_token(principal: Principal, binding: TokenBinding) -> Response {
    let body: PrincipalResponse = principal.into();
    (StatusCode::OK, [(AUTH_HEADER, binding.token)], Json(body)).into_response()
}

// POST /users
pub async fn register<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response> {
    let principal = manager.register(&req.identity, &req.credential).await?;
    let binding = manager.issue(&principal).await?;

    Ok(with_token(principal, binding))
}

// POST /users/login
pub async fn login<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response> {
    let binding = manager.authenticate(&req.identity, &req.credential).await?;
    let principal = manager.verify(&binding.token).await?;

    Ok(with_token(principal, binding))
}

// DELETE /users/me/token
pub async fn logout<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    Extension(auth): Extension<AuthPrincipal>,
) -> Result<Json<serde_json::Value>> {
    manager.revoke(&auth.token).await?;

    Ok(Json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

// DELETE /users/me/tokens
pub async fn logout_everywhere<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    Extension(auth): Extension<AuthPrincipal>,
) -> Result<Json<serde_json::Value>> {
    let revoked = manager.revoke_all(auth.principal.id).await?;
    info!(principal_id = %auth.principal.id, revoked, "Logged out of every session");

    Ok(Json(serde_json::json!({
        "message": "Logged out of all sessions",
        "revoked": revoked
    })))
}
