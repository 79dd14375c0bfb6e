use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::digest::{constant_time_eq, DigestEngine};
use super::token::AuthToken;
use crate::database::PrincipalStore;
use crate::errors::{AppError, Result};
use crate::models::{Principal, TokenBinding};
use crate::validation::PrincipalValidator;

/// Owns principals and token bindings; the only writer to the store.
pub struct TokenManager<S> {
    engine: DigestEngine,
    store: S,
}

impl<S: PrincipalStore> TokenManager<S> {
    pub fn new(engine: DigestEngine, store: S) -> Self {
        Self { engine, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a principal. Only the digest of `credential` is stored.
    pub async fn register(&self, identity: &str, credential: &str) -> Result<Principal> {
        PrincipalValidator::validate_registration(identity, credential).into_result()?;

        let principal = Principal {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            credential_digest: DigestEngine::digest(credential.as_bytes()),
            created_at: Utc::now(),
        };

        self.store.insert_principal(&principal).await?;
        info!(principal_id = %principal.id, "Principal registered");

        Ok(principal)
    }

    /// Check `credential` for `identity` and issue a fresh binding on success.
    pub async fn authenticate(&self, identity: &str, credential: &str) -> Result<TokenBinding> {
        let presented = DigestEngine::digest(credential.as_bytes());

        let principal = match self.store.find_principal_by_identity(identity).await? {
            Some(principal)
                if constant_time_eq(
                    principal.credential_digest.as_bytes(),
                    presented.as_bytes(),
                ) =>
            {
                principal
            }
            _ => {
                debug!("Authentication rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        self.issue(&principal).await
    }

    /// Mint and persist a new token for an already-authenticated principal.
    pub async fn issue(&self, principal: &Principal) -> Result<TokenBinding> {
        let id = principal.id.to_string();
        let digest = self.engine.keyed_digest(id.as_bytes());
        let token = AuthToken::new(id, digest.clone());

        let binding = TokenBinding {
            token: token.to_string(),
            principal_id: principal.id,
            digest,
            created_at: Utc::now(),
        };

        self.store.insert_binding(&binding).await?;
        info!(principal_id = %principal.id, "Token issued");

        Ok(binding)
    }

    /// Resolve a presented token to its principal.
    ///
    /// The digest is checked before anything in the token is used for a
    /// lookup. Every failure is `InvalidToken`; store outages still surface
    /// as `StoreUnavailable`.
    pub async fn verify(&self, token_value: &str) -> Result<Principal> {
        let token = AuthToken::parse(token_value).ok_or(AppError::InvalidToken)?;

        let expected = self.engine.keyed_digest(token.principal_id.as_bytes());
        if !constant_time_eq(token.digest.as_bytes(), expected.as_bytes()) {
            warn!("Token digest mismatch");
            return Err(AppError::InvalidToken);
        }

        let claimed_id = Uuid::parse_str(&token.principal_id).map_err(|_| AppError::InvalidToken)?;

        match self.store.find_principal_by_token(token_value).await? {
            Some(principal) if principal.id == claimed_id => Ok(principal),
            Some(principal) => {
                warn!(principal_id = %principal.id, "Token bound to a different principal");
                Err(AppError::InvalidToken)
            }
            None => {
                debug!(principal_id = %claimed_id, "No live binding for token");
                Err(AppError::InvalidToken)
            }
        }
    }

    /// Drop the binding for `token_value`. Missing tokens are not an error.
    pub async fn revoke(&self, token_value: &str) -> Result<()> {
        if self.store.delete_binding(token_value).await? {
            info!("Token revoked");
        }
        Ok(())
    }

    /// Drop every binding held by `principal_id`; returns how many went.
    pub async fn revoke_all(&self, principal_id: Uuid) -> Result<u64> {
        let removed = self.store.delete_bindings_for(principal_id).await?;
        info!(principal_id = %principal_id, removed, "All tokens revoked");
        Ok(removed)
    }

    pub async fn active_binding_count(&self, principal_id: Uuid) -> Result<u64> {
        self.store.count_bindings_for(principal_id).await
    }

    /// Replace the stored credential digest after checking the current one.
    /// Existing bindings stay valid.
    pub async fn change_credential(
        &self,
        principal_id: Uuid,
        current_credential: &str,
        new_credential: &str,
    ) -> Result<()> {
        PrincipalValidator::validate_credential(new_credential).into_result()?;

        let principal = self
            .store
            .find_principal_by_id(principal_id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let presented = DigestEngine::digest(current_credential.as_bytes());
        if !constant_time_eq(principal.credential_digest.as_bytes(), presented.as_bytes()) {
            return Err(AppError::InvalidCredentials);
        }

        let new_digest = DigestEngine::digest(new_credential.as_bytes());
        if !self.store.update_credential_digest(principal_id, &new_digest).await? {
            return Err(AppError::InvalidCredentials);
        }

        info!(principal_id = %principal_id, "Credential changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    const SECRET: &str = "somesecret";

    fn manager() -> TokenManager<MemoryStore> {
        TokenManager::new(DigestEngine::new(SECRET), MemoryStore::new())
    }

    /// Every single-bit mutation of `token[range]` that stays valid UTF-8.
    fn bit_flips(token: &str, range: std::ops::Range<usize>) -> Vec<String> {
        let mut out = Vec::new();
        for index in range {
            for bit in 0..8 {
                let mut bytes = token.as_bytes().to_vec();
                bytes[index] ^= 1u8 << bit;
                if let Ok(mutated) = String::from_utf8(bytes) {
                    out.push(mutated);
                }
            }
        }
        out
    }

    #[tokio::test]
    async fn alice_example_flow() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();

        let binding = manager.authenticate("alice", "pw1").await.unwrap();
        let verified = manager.verify(&binding.token).await.unwrap();
        assert_eq!(verified.id, alice.id);
        assert_eq!(verified.identity, "alice");

        manager.revoke(&binding.token).await.unwrap();
        assert!(matches!(manager.verify(&binding.token).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn credential_is_stored_as_digest() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();

        assert_ne!(alice.credential_digest, "pw1");
        assert_eq!(alice.credential_digest, DigestEngine::digest(b"pw1"));
    }

    #[tokio::test]
    async fn binding_digest_is_keyed_digest_of_id() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();

        let expected = DigestEngine::new(SECRET).keyed_digest(alice.id.to_string().as_bytes());
        assert_eq!(binding.digest, expected);
        assert_eq!(binding.principal_id, alice.id);
        assert!(binding.token.starts_with(&alice.id.to_string()));
        assert!(binding.token.ends_with(&expected));
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original_credential() {
        let manager = manager();
        let original = manager.register("alice", "pw1").await.unwrap();

        let result = manager.register("alice", "other").await;
        assert!(matches!(result, Err(AppError::DuplicateIdentity)));

        let stored = manager.store().find_principal_by_identity("alice").await.unwrap().unwrap();
        assert_eq!(stored.credential_digest, original.credential_digest);
        assert!(manager.authenticate("alice", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_credential_creates_no_binding() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();
        let earlier = manager.authenticate("alice", "pw1").await.unwrap();
        let before = manager.active_binding_count(alice.id).await.unwrap();

        let result = manager.authenticate("alice", "wrong").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert_eq!(manager.active_binding_count(alice.id).await.unwrap(), before);

        // earlier tokens are unaffected
        assert_eq!(manager.verify(&earlier.token).await.unwrap().id, alice.id);
    }

    #[tokio::test]
    async fn unknown_identity_looks_like_wrong_credential() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();

        let unknown = manager.authenticate("mallory", "pw1").await;
        let wrong = manager.authenticate("alice", "pw2").await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn multiple_sessions_get_distinct_tokens() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();

        let first = manager.authenticate("alice", "pw1").await.unwrap();
        let second = manager.authenticate("alice", "pw1").await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(first.digest, second.digest);
        assert_eq!(manager.active_binding_count(alice.id).await.unwrap(), 2);

        manager.revoke(&first.token).await.unwrap();
        assert!(manager.verify(&first.token).await.is_err());
        assert_eq!(manager.verify(&second.token).await.unwrap().id, alice.id);
    }

    #[tokio::test]
    async fn verify_is_repeatable() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();

        for _ in 0..3 {
            assert_eq!(manager.verify(&binding.token).await.unwrap().identity, "alice");
        }
    }

    #[tokio::test]
    async fn any_bit_flip_in_id_or_digest_is_rejected() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();
        let token = AuthToken::parse(&binding.token).unwrap();

        let id_range = 0..token.principal_id.len();
        let digest_start = binding.token.len() - token.digest.len();
        let digest_range = digest_start..binding.token.len();

        let mut mutations = bit_flips(&binding.token, id_range);
        mutations.extend(bit_flips(&binding.token, digest_range));
        assert!(!mutations.is_empty());

        for mutated in mutations {
            let result = manager.verify(&mutated).await;
            assert!(matches!(result, Err(AppError::InvalidToken)), "accepted {}", mutated);
        }
    }

    #[tokio::test]
    async fn nonce_tampering_is_rejected() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();
        let token = AuthToken::parse(&binding.token).unwrap();

        let nonce_start = token.principal_id.len() + 1;
        let nonce_range = nonce_start..nonce_start + token.nonce.len();
        for mutated in bit_flips(&binding.token, nonce_range) {
            assert!(matches!(manager.verify(&mutated).await, Err(AppError::InvalidToken)));
        }
    }

    #[tokio::test]
    async fn forged_token_for_other_principal_is_rejected() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();
        let bob = manager.register("bob", "pw2").await.unwrap();
        let alice_binding = manager.authenticate("alice", "pw1").await.unwrap();
        let alice_token = AuthToken::parse(&alice_binding.token).unwrap();

        // swap in bob's id, keep alice's nonce and digest
        let forged = AuthToken {
            principal_id: bob.id.to_string(),
            ..alice_token.clone()
        };
        assert!(matches!(manager.verify(&forged.to_string()).await, Err(AppError::InvalidToken)));

        // digest recomputed without the secret
        let unkeyed = AuthToken {
            principal_id: bob.id.to_string(),
            nonce: alice_token.nonce.clone(),
            digest: DigestEngine::digest(bob.id.to_string().as_bytes()),
        };
        assert!(matches!(manager.verify(&unkeyed.to_string()).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn token_from_another_secret_is_rejected() {
        let issuer = manager();
        issuer.register("alice", "pw1").await.unwrap();
        let binding = issuer.authenticate("alice", "pw1").await.unwrap();

        let other = TokenManager::new(DigestEngine::new("different"), MemoryStore::new());
        assert!(matches!(other.verify(&binding.token).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn malformed_tokens_are_invalid() {
        let manager = manager();
        for value in ["", "garbage", "a.b", "a.b.c", "..", "\u{0}"] {
            assert!(matches!(manager.verify(value).await, Err(AppError::InvalidToken)));
        }
    }

    #[tokio::test]
    async fn deleted_principal_invalidates_tokens() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();

        manager.store().delete_principal(alice.id).await.unwrap();
        assert!(matches!(manager.verify(&binding.token).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let manager = manager();
        manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();

        manager.revoke(&binding.token).await.unwrap();
        manager.revoke(&binding.token).await.unwrap();
        manager.revoke("never-issued").await.unwrap();
        manager.revoke("").await.unwrap();
    }

    #[tokio::test]
    async fn revoke_all_clears_every_session() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();
        let first = manager.authenticate("alice", "pw1").await.unwrap();
        let second = manager.authenticate("alice", "pw1").await.unwrap();

        assert_eq!(manager.revoke_all(alice.id).await.unwrap(), 2);
        assert!(manager.verify(&first.token).await.is_err());
        assert!(manager.verify(&second.token).await.is_err());
        assert_eq!(manager.revoke_all(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn change_credential_requires_current_one() {
        let manager = manager();
        let alice = manager.register("alice", "pw1").await.unwrap();
        let binding = manager.authenticate("alice", "pw1").await.unwrap();

        let result = manager.change_credential(alice.id, "nope", "pw2").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));

        manager.change_credential(alice.id, "pw1", "pw2").await.unwrap();
        assert!(manager.authenticate("alice", "pw1").await.is_err());
        assert!(manager.authenticate("alice", "pw2").await.is_ok());
        assert!(manager.verify(&binding.token).await.is_ok());
    }

    #[tokio::test]
    async fn register_rejects_invalid_input() {
        let manager = manager();
        assert!(matches!(manager.register("", "pw1").await, Err(AppError::ValidationError(_))));
        assert!(matches!(manager.register("alice", "").await, Err(AppError::ValidationError(_))));
    }
}
