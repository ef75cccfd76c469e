//! Storage traits for issuer collaborators.
//!
//! Each trait describes one external dependency of the request pipelines.
//! [`memory`] provides in-process implementations.

mod auth_code;
mod client;
mod identity_check;
pub mod memory;
mod token;

pub use auth_code::{AuthorizationCodeItem, AuthorizationCodeStore};
pub use client::{ClientConfigStore, ClientTrustConfig};
pub use identity_check::IdentityCheckStore;
pub use token::AccessTokenStore;
