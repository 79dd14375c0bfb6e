use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::PrincipalStore;
use crate::errors::{AppError, Result};
use crate::models::{Principal, TokenBinding};

#[derive(Debug, Default)]
struct Tables {
    principals: HashMap<Uuid, Principal>,
    identities: HashMap<String, Uuid>,
    bindings: HashMap<String, TokenBinding>,
}

/// In-process store. Every write takes the single lock, which is what
/// makes the uniqueness checks atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrincipalStore for MemoryStore {
    async fn insert_principal(&self, principal: &Principal) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables.identities.contains_key(&principal.identity)
            || tables.principals.contains_key(&principal.id)
        {
            return Err(AppError::DuplicateIdentity);
        }

        tables.identities.insert(principal.identity.clone(), principal.id);
        tables.principals.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn find_principal_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables.principals.get(&id).cloned())
    }

    async fn find_principal_by_identity(&self, identity: &str) -> Result<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .identities
            .get(identity)
            .and_then(|id| tables.principals.get(id))
            .cloned())
    }

    async fn update_credential_digest(&self, id: Uuid, credential_digest: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.principals.get_mut(&id) {
            Some(principal) => {
                principal.credential_digest = credential_digest.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_principal(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(principal) = tables.principals.remove(&id) else {
            return Ok(false);
        };
        tables.identities.remove(&principal.identity);
        tables.bindings.retain(|_, binding| binding.principal_id != id);
        Ok(true)
    }

    async fn insert_binding(&self, binding: &TokenBinding) -> Result<()> {
        let mut tables = self.tables.write().await;

        if !tables.principals.contains_key(&binding.principal_id) {
            return Err(AppError::store("binding references an unknown principal"));
        }
        if tables.bindings.contains_key(&binding.token) {
            return Err(AppError::store("token value already bound"));
        }

        tables.bindings.insert(binding.token.clone(), binding.clone());
        Ok(())
    }

    async fn find_principal_by_token(&self, token: &str) -> Result<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bindings
            .get(token)
            .and_then(|binding| tables.principals.get(&binding.principal_id))
            .cloned())
    }

    async fn delete_binding(&self, token: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.bindings.remove(token).is_some())
    }

    async fn delete_bindings_for(&self, principal_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.bindings.len();
        tables.bindings.retain(|_, binding| binding.principal_id != principal_id);
        Ok((before - tables.bindings.len()) as u64)
    }

    async fn count_bindings_for(&self, principal_id: Uuid) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .bindings
            .values()
            .filter(|binding| binding.principal_id == principal_id)
            .count() as u64)
    }
}
