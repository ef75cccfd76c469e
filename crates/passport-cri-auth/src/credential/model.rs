//! Identity check records and the verifiable credential built from them.
//!
//! Every type here is camelCase on the wire. Dates are calendar dates written
//! as `YYYY-MM-DD`.

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

// ============================================================================
// Stored Identity Check
// ============================================================================

/// The stored result of a passport check, keyed by resource id.
///
/// Written by the upstream check; every field it fills in may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCheckRecord {
    /// Resource id the record is stored under.
    pub resource_id: String,

    /// Attributes of the checked passport.
    #[serde(default)]
    pub attributes: Option<PassportAttributes>,

    /// Evidence score awarded by the check.
    #[serde(default)]
    pub gpg45_score: Option<Evidence>,
}

/// Attributes of a checked passport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassportAttributes {
    pub passport_number: Option<String>,
    pub surname: Option<String>,
    pub forenames: Option<Vec<String>>,
    #[serde(with = "iso_date::option")]
    pub date_of_birth: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub expiry_date: Option<Date>,
    pub request_id: Option<Uuid>,
    pub correlation_id: Option<Uuid>,
    pub dcs_response: Option<DcsResponse>,

    /// Period the name is known to be valid for, if the check reported one.
    pub name_validity: Option<ValidityWindow>,
}

/// The upstream document checking service's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcsResponse {
    pub correlation_id: Uuid,
    pub request_id: Uuid,
    pub error: bool,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Vec<String>>,
}

/// A validity window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidityWindow {
    #[serde(with = "iso_date::option", skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<Date>,
    #[serde(with = "iso_date::option", skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Date>,
}

/// Evidence block shared by the stored record and the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub gpg45_evidence: Gpg45Evidence,
}

/// GPG45 strength and validity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gpg45Evidence {
    pub strength: u8,
    pub validity: u8,
}

// ============================================================================
// Verifiable Credential
// ============================================================================

/// The passport verifiable credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    pub resource_id: String,
    pub credential_subject: CredentialSubject,
    pub evidence: Evidence,
}

/// Claims about the passport holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub name: Name,
    pub passport_number: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    #[serde(with = "iso_date")]
    pub expiry_date: Date,
    pub request_id: Uuid,
    pub correlation_id: Uuid,
    pub dcs_response: DcsResponse,
}

/// A structured name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    pub name_parts: Vec<NamePart>,
}

/// One part of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePart {
    pub value: String,
    #[serde(rename = "type")]
    pub part_type: NamePartType,
    #[serde(flatten)]
    pub validity: ValidityWindow,
}

/// Kind of a name part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamePartType {
    GivenName,
    FamilyName,
}

/// Claims of the signed credential JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject of the original authorization request.
    pub sub: String,

    /// The credential.
    pub vc: VerifiableCredential,
}
