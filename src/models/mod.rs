pub mod principal;

pub use principal::{
    Principal, TokenBinding, CredentialsRequest, ChangeCredentialRequest, PrincipalResponse,
};
