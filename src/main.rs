use authseal::{
    config::Config,
    database::{self, MemoryStore, PgStore, PrincipalStore},
    routes, DigestEngine, TokenManager,
};
use env_logger::Env;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    env_logger::init_from_env(Env::default().default_filter_or(config.rust_log()));

    let engine = DigestEngine::new(config.token_secret.as_bytes());

    if config.uses_memory_store() {
        warn!("Using the in-memory store; nothing survives a restart");
        serve(&config, TokenManager::new(engine, MemoryStore::new())).await;
        return;
    }

    let pool = match database::create_pool(&config).await {
        Ok(pool) => {
            info!("Database pool created successfully");
            pool
        },
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    let store = PgStore::new(pool);
    if let Err(e) = store.migrate().await {
        error!("Failed to prepare schema: {}", e);
        std::process::exit(1);
    }

    serve(&config, TokenManager::new(engine, store)).await;
}

async fn serve<S: PrincipalStore>(config: &Config, manager: TokenManager<S>) {
    let bind_address = format!("{}:{}", config.host, config.port);
    let app = routes::app(Arc::new(manager));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", bind_address, e);
            std::process::exit(1);
        });

    info!(env = ?config.app_env, "Starting server at http://{}", bind_address);

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            error!("Server error: {}", e);
            std::process::exit(1);
        });
}
