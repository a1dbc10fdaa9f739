use std::collections::HashMap;

use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    trust::TrustPath,
    webauthn::AttestationFormat,
};

use crate::{
    formats::{
        AndroidKeyAttestation, AndroidSafetyNetAttestation, AppleAttestation,
        AttestationStatementVerifier, FidoU2fAttestation, NoneAttestation, PackedAttestation,
        TpmAttestation, Verifier,
    },
    AttestationError,
};

/// The attestation statement verifiers a relying party accepts, keyed by format.
///
/// A format without a registered verifier is rejected with
/// [`AttestationError::UnsupportedAttestationFormat`], so removing a verifier is how a relying
/// party refuses a format.
#[derive(Debug, Clone, Default)]
pub struct AttestationStatementRegistry {
    verifiers: HashMap<AttestationFormat, Verifier>,
}

impl AttestationStatementRegistry {
    /// A registry without any verifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a verifier for every format of the WebAuthn registry. SafetyNet
    /// responses are checked against the system clock with the default freshness policy.
    pub fn with_default_formats() -> Self {
        Self::new()
            .with_verifier(NoneAttestation)
            .with_verifier(FidoU2fAttestation)
            .with_verifier(PackedAttestation)
            .with_verifier(TpmAttestation)
            .with_verifier(AndroidKeyAttestation)
            .with_verifier(AndroidSafetyNetAttestation::default())
            .with_verifier(AppleAttestation)
    }

    /// Builder flavour of [`Self::register`].
    pub fn with_verifier(mut self, verifier: impl Into<Verifier>) -> Self {
        self.register(verifier);
        self
    }

    /// Register a verifier, returning the one it replaces for the same format.
    pub fn register(&mut self, verifier: impl Into<Verifier>) -> Option<Verifier> {
        let verifier = verifier.into();
        self.verifiers.insert(verifier.format(), verifier)
    }

    /// Stop accepting `format`.
    pub fn remove(&mut self, format: AttestationFormat) -> Option<Verifier> {
        self.verifiers.remove(&format)
    }

    /// The verifier for a `fmt` identifier.
    pub fn find(&self, format: &str) -> Result<&Verifier, AttestationError> {
        format
            .parse::<AttestationFormat>()
            .ok()
            .and_then(|format| self.verifiers.get(&format))
            .ok_or_else(|| AttestationError::UnsupportedAttestationFormat(format.to_owned()))
    }

    /// Verify a statement with the verifier registered for its format.
    pub fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<(AttestationFormat, TrustPath), AttestationError> {
        let verifier = self.find(statement.format())?;
        let format = verifier.format();
        let path = verifier
            .verify(statement, auth_data, client_data_hash)
            .map_err(|e| {
                log::warn!("{format} attestation statement rejected: {e}");
                e
            })?;
        log::debug!("{format} attestation statement verified, {} trust path", path.kind());
        Ok((format, path))
    }
}
