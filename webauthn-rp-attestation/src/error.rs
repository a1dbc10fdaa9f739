use webauthn_rp_types::authenticator::DecodeError;

/// Failure to verify an attestation statement.
///
/// Field presence and types are checked before any certificate is parsed or any signature is
/// verified, so a statement missing a field always fails with [`AttestationError::MissingField`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationError {
    /// No verifier is registered under this format identifier.
    #[error("unsupported attestation statement format {0:?}")]
    UnsupportedAttestationFormat(String),
    /// A field the format requires is absent.
    #[error("attestation statement is missing {0:?}")]
    MissingField(&'static str),
    /// A field is present but has the wrong type or an unacceptable value.
    #[error("attestation statement field {0:?} is invalid")]
    InvalidField(&'static str),
    /// A signature did not verify.
    #[error("attestation signature does not verify")]
    SignatureMismatch,
    /// A certificate could not be parsed or does not meet the format's requirements.
    #[error("invalid attestation certificate: {0}")]
    InvalidCertificate(String),
    /// A certificate extension is missing or does not match the authenticator data.
    #[error("attestation certificate extension {0} does not match")]
    InvalidCertificateExtension(&'static str),
    /// The attested key is not the credential public key.
    #[error("attested key does not match the credential public key")]
    CredentialKeyMismatch,
    /// The signing algorithm is not one this library verifies.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(i64),
    /// The authenticator data could not be used.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failure to establish trust in an attestation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    /// Self or no attestation while the relying party requires metadata backed attestation.
    #[error("{0} attestation is not accepted")]
    AttestationNotTrusted(&'static str),
    /// The certificate path does not lead to any configured anchor.
    #[error("certificate path does not chain to a trust anchor")]
    UntrustedChain,
    /// A certificate in the path is not signed by the next one, or by the anchor it names.
    #[error("certificate path is broken at position {0}")]
    ChainBroken(usize),
    /// A certificate in the path is outside its validity period.
    #[error("certificate at position {0} is expired or not yet valid")]
    CertificateExpired(usize),
    /// The ECDAA signature could not be verified against an issuer key.
    #[error("ECDAA attestation could not be verified")]
    EcdaaVerificationFailed,
    /// A certificate in the path or an anchor could not be parsed.
    #[error("invalid certificate in trust path: {0}")]
    InvalidCertificate(String),
}
