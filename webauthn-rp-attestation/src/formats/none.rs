use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    trust::TrustPath,
    webauthn::AttestationFormat,
};

use super::AttestationStatementVerifier;
use crate::AttestationError;

/// The `none` format: the authenticator chose, or was asked, not to attest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAttestation;

impl AttestationStatementVerifier for NoneAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::None
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        _auth_data: &AuthenticatorData,
        _client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        if let Some(field) = statement.keys().next() {
            log::debug!("`none` attestation carries unexpected field {field}");
            return Err(AttestationError::InvalidField("attStmt"));
        }
        Ok(TrustPath::None)
    }
}
