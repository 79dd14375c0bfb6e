pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod routes;
pub mod validation;

pub use auth::{DigestEngine, TokenManager};
pub use config::Config;
pub use errors::{AppError, Result};
