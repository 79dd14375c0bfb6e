use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub identity: String,
    pub credential_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted association between a principal and one issued token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenBinding {
    pub token: String,
    pub principal_id: Uuid,
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrincipalResponse {
    pub id: Uuid,
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub identity: String,
    pub credential: String,
}

#[derive(Deserialize)]
pub struct ChangeCredentialRequest {
    pub current_credential: String,
    pub new_credential: String,
}

impl From<Principal> for PrincipalResponse {
    fn from(principal: Principal) -> Self {
        PrincipalResponse {
            id: principal.id,
            identity: principal.identity,
            created_at: principal.created_at,
        }
    }
}
