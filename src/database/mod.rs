pub mod memory;
pub mod psql;

use std::future::Future;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Principal, TokenBinding};

pub use memory::MemoryStore;
pub use psql::{create_pool, DbPool, PgStore};

/// Durable keyed storage for principals and their token bindings.
///
/// Identity and token uniqueness are enforced here, not by callers:
/// `insert_principal` fails with `DuplicateIdentity` on a taken identity.
/// Deleting a principal removes its bindings too.
pub trait PrincipalStore: Send + Sync + 'static {
    fn insert_principal(&self, principal: &Principal) -> impl Future<Output = Result<()>> + Send;

    fn find_principal_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<Principal>>> + Send;

    fn find_principal_by_identity(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<Option<Principal>>> + Send;

    /// Returns false when no principal has `id`.
    fn update_credential_digest(
        &self,
        id: Uuid,
        credential_digest: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn delete_principal(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    fn insert_binding(&self, binding: &TokenBinding) -> impl Future<Output = Result<()>> + Send;

    /// Owner of the live binding for `token`, in a single read.
    fn find_principal_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<Principal>>> + Send;

    fn delete_binding(&self, token: &str) -> impl Future<Output = Result<bool>> + Send;

    fn delete_bindings_for(&self, principal_id: Uuid) -> impl Future<Output = Result<u64>> + Send;

    fn count_bindings_for(&self, principal_id: Uuid) -> impl Future<Output = Result<u64>> + Send;
}
