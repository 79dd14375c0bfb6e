use sha2::{Digest, Sha256};
use std::fmt;

/// Length of every rendered digest (SHA-256 as lowercase hex).
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 digest engine holding the server secret.
///
/// `keyed_digest` always hashes `payload || secret`, payload first, so a
/// holder of the payload alone cannot forge a matching digest.
#[derive(Clone)]
pub struct DigestEngine {
    secret: Vec<u8>,
}

impl fmt::Debug for DigestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestEngine")
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl DigestEngine {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Unkeyed digest, used for stored credentials.
    pub fn digest(input: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input);
        format!("{:x}", hasher.finalize())
    }

    /// Digest of `payload` with the server secret appended.
    pub fn keyed_digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.update(&self.secret);
        format!("{:x}", hasher.finalize())
    }
}

/// Constant-time equality for digests and other secrets-derived strings.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.iter().zip(b.iter()) {
        result |= a_byte ^ b_byte;
    }
    result == 0
}
