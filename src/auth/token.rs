use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{thread_rng, RngCore};
use std::fmt;

use super::digest::DIGEST_HEX_LEN;

/// Header carrying the serialized token in both directions.
pub const AUTH_HEADER: &str = "x-auth";

/// Random bytes behind each token's nonce.
const NONCE_BYTES: usize = 32;

const SEPARATOR: char = '.';

/// Serialized form: `<principal-id>.<nonce>.<digest>`.
///
/// `digest` is the keyed digest of the principal id exactly as written in
/// the first segment. The nonce only makes each issued value unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub principal_id: String,
    pub nonce: String,
    pub digest: String,
}

impl AuthToken {
    pub fn new(principal_id: String, digest: String) -> Self {
        Self {
            principal_id,
            nonce: generate_nonce(),
            digest,
        }
    }

    /// Split a presented value into its three segments. Returns `None` for
    /// anything that is not shaped like a token; content is not trusted yet.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.splitn(3, SEPARATOR);
        let principal_id = parts.next()?;
        let nonce = parts.next()?;
        let digest = parts.next()?;

        if principal_id.is_empty() || nonce.is_empty() || digest.len() != DIGEST_HEX_LEN {
            return None;
        }

        Some(Self {
            principal_id: principal_id.to_string(),
            nonce: nonce.to_string(),
            digest: digest.to_string(),
        })
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.principal_id,
            self.nonce,
            self.digest,
            sep = SEPARATOR
        )
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
