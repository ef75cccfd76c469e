//! Maps a stored identity check onto the verifiable credential.
//!
//! Assembly never emits partial data: the first absent required field fails
//! the whole credential with [`AuthError::CredentialAssembly`] naming it.

use crate::{AuthError, AuthResult};

use super::model::{
    CredentialSubject, IdentityCheckRecord, Name, NamePart, NamePartType, VerifiableCredential,
};

/// Builds verifiable credentials from identity check records.
pub struct CredentialAssembler;

impl CredentialAssembler {
    /// Assembles the credential for `record`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialAssembly` if a required field is absent or the
    /// record has no forenames.
    pub fn assemble(record: &IdentityCheckRecord) -> AuthResult<VerifiableCredential> {
        let attributes = required(record.attributes.as_ref(), "attributes")?;
        let evidence = *required(record.gpg45_score.as_ref(), "gpg45Score")?;

        let forenames = required(attributes.forenames.as_ref(), "attributes.forenames")?;
        if forenames.is_empty() {
            return Err(AuthError::credential_assembly("attributes.forenames"));
        }
        let surname = required(attributes.surname.as_ref(), "attributes.surname")?;

        let validity = attributes.name_validity.unwrap_or_default();
        let name_parts = forenames
            .iter()
            .map(|forename| (forename, NamePartType::GivenName))
            .chain(std::iter::once((surname, NamePartType::FamilyName)))
            .map(|(value, part_type)| NamePart {
                value: value.clone(),
                part_type,
                validity,
            })
            .collect();

        let credential_subject = CredentialSubject {
            name: Name { name_parts },
            passport_number: required(
                attributes.passport_number.as_ref(),
                "attributes.passportNumber",
            )?
            .clone(),
            birth_date: *required(attributes.date_of_birth.as_ref(), "attributes.dateOfBirth")?,
            expiry_date: *required(attributes.expiry_date.as_ref(), "attributes.expiryDate")?,
            request_id: *required(attributes.request_id.as_ref(), "attributes.requestId")?,
            correlation_id: *required(
                attributes.correlation_id.as_ref(),
                "attributes.correlationId",
            )?,
            dcs_response: required(attributes.dcs_response.as_ref(), "attributes.dcsResponse")?
                .clone(),
        };

        Ok(VerifiableCredential {
            resource_id: record.resource_id.clone(),
            credential_subject,
            evidence,
        })
    }
}

fn required<'a, T>(value: Option<&'a T>, field: &str) -> AuthResult<&'a T> {
    value.ok_or_else(|| {
        tracing::error!(field = %field, "Identity check record is missing a required field");
        AuthError::credential_assembly(field)
    })
}
