pub mod digest;
pub mod manager;
pub mod middleware;
pub mod token;

pub use digest::{constant_time_eq, DigestEngine, DIGEST_HEX_LEN};
pub use manager::TokenManager;
pub use middleware::{auth_middleware, AuthPrincipal};
pub use token::{AuthToken, AUTH_HEADER};
