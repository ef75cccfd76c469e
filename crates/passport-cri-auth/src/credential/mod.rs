//! Passport verifiable credential issuance.

pub mod assembler;
pub mod model;
pub mod service;

pub use assembler::CredentialAssembler;
pub use model::{
    CredentialClaims, CredentialSubject, DcsResponse, Evidence, Gpg45Evidence,
    IdentityCheckRecord, Name, NamePart, NamePartType, PassportAttributes, ValidityWindow,
    VerifiableCredential,
};
pub use service::{CredentialIssuer, IssuedCredential, MISSING_SUBJECT_DESCRIPTION, subject_from_request_jwt};
