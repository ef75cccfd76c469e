//! Access token resolution and credential signing.

pub mod bearer;
pub mod jwt;

pub use bearer::{AccessTokenResolver, parse_bearer};
pub use jwt::{CREDENTIAL_SIGNING_ALGORITHM, CredentialSigner, JwtError};
