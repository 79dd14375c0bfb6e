use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    auth::{TokenManager, AUTH_HEADER},
    database::PrincipalStore,
    errors::AppError,
    models::Principal,
};

/// Verified caller, injected into protected route handlers.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub principal: Principal,
    /// The token value the request presented, needed for logout.
    pub token: String,
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Rejects requests without a valid `x-auth` token. The response never says
/// which check failed.
pub async fn auth_middleware<S: PrincipalStore>(
    Extension(manager): Extension<Arc<TokenManager<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_headers(request.headers()).ok_or_else(|| {
        debug!("Request without auth header");
        AppError::Unauthorized
    })?;

    let principal = manager.verify(&token).await?;

    request
        .extensions_mut()
        .insert(AuthPrincipal { principal, token });
    Ok(next.run(request).await)
}
