use axum::{extract::Extension, response::Json};
use std::sync::Arc;

use crate::{
    auth::{AuthPrincipal, TokenManager},
    database::PrincipalStore,
    errors::Result,
    models::{ChangeCredentialRequest, PrincipalResponse},
};

// GET /users/me
pub async fn me(Extension(auth): Extension<AuthPrincipal>) -> Json<PrincipalResponse> {
    Json(auth.principal.into())
}

// PUT /users/me/credential
pub async fn change_credential<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    Extension(auth): Extension<AuthPrincipal>,
    Json(req): Json<ChangeCredentialRequest>,
) -> Result<Json<serde_json::Value>> {
    manager
        .change_credential(auth.principal.id, &req.current_credential, &req.new_credential)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Credential updated"
    })))
}
