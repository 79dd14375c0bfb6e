use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use super::PrincipalStore;
use crate::config::Config;
use crate::errors::{AppError, Result};
use crate::models::{Principal, TokenBinding};

pub type DbPool = Pool<Postgres>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS principals (
    id UUID PRIMARY KEY,
    identity TEXT NOT NULL UNIQUE,
    credential_digest TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS token_bindings (
    token TEXT PRIMARY KEY,
    principal_id UUID NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    digest TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_token_bindings_principal ON token_bindings(principal_id);
"#;

pub async fn create_pool(config: &Config) -> std::result::Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
}

/// Postgres-backed store. Safe to share between several server processes:
/// uniqueness lives in the table constraints.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Schema ready");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl PrincipalStore for PgStore {
    async fn insert_principal(&self, principal: &Principal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO principals (id, identity, credential_digest, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(principal.id)
        .bind(&principal.identity)
        .bind(&principal.credential_digest)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateIdentity
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }

    async fn find_principal_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, identity, credential_digest, created_at FROM principals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn find_principal_by_identity(&self, identity: &str) -> Result<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, identity, credential_digest, created_at FROM principals WHERE identity = $1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn update_credential_digest(&self, id: Uuid, credential_digest: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE principals SET credential_digest = $2 WHERE id = $1")
            .bind(id)
            .bind(credential_digest)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_principal(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_binding(&self, binding: &TokenBinding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO token_bindings (token, principal_id, digest, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&binding.token)
        .bind(binding.principal_id)
        .bind(&binding.digest)
        .bind(binding.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_principal_by_token(&self, token: &str) -> Result<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"
            SELECT p.id, p.identity, p.credential_digest, p.created_at
            FROM token_bindings b
            JOIN principals p ON p.id = b.principal_id
            WHERE b.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn delete_binding(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM token_bindings WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_bindings_for(&self, principal_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM token_bindings WHERE principal_id = $1")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_bindings_for(&self, principal_id: Uuid) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM token_bindings WHERE principal_id = $1")
                .bind(principal_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }
}
