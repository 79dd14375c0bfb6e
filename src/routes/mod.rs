pub mod auth;
pub mod users;

use axum::{
    extract::Extension,
    middleware::from_fn,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::{auth_middleware, TokenManager},
    database::PrincipalStore,
};

/// Full application router over any store.
pub fn app<S: PrincipalStore>(manager: Arc<TokenManager<S>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/users", user_routes::<S>())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(Extension(manager)),
        )
}

fn user_routes<S: PrincipalStore>() -> Router {
    let protected_routes = Router::new()
        .route("/me", get(users::me))
        .route("/me/token", delete(auth::logout::<S>))
        .route("/me/tokens", delete(auth::logout_everywhere::<S>))
        .route("/me/credential", put(users::change_credential::<S>))
        .layer(from_fn(auth_middleware::<S>));

    Router::new()
        .route("/", post(auth::register::<S>))
        .route("/login", post(auth::login::<S>))
        .merge(protected_routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
