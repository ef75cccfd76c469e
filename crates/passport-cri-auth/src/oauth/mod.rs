//! OAuth 2.0 authorization responses and authorization codes.

pub mod authorize;
pub mod code;

pub use authorize::{AuthorizationError, AuthorizationResponse};
pub use code::{AuthorizationCodeService, hash_code};
