use webauthn_rp_attestation::{AttestationError, TrustError};
use webauthn_rp_types::authenticator::{CoseKeyError, DecodeError};

use crate::repository::RepositoryError;

/// Why a registration or authentication ceremony failed.
///
/// Every check of a ceremony maps to exactly one variant, and the first failing check ends the
/// ceremony. Nothing is persisted when a ceremony fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CeremonyError {
    /// The client data, authenticator data or attestation object could not be decoded.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// The client data challenge is not the one issued for this ceremony.
    #[error("challenge does not match")]
    ChallengeMismatch,
    /// The client data origin is not accepted for the relying party.
    #[error("origin {0:?} is not allowed")]
    OriginMismatch(String),
    /// The authenticator data is scoped to another relying party ID.
    #[error("authenticator data was produced for another relying party")]
    RpIdMismatch,
    /// The client data type is not the one of this ceremony.
    #[error("client data type does not match the ceremony")]
    TypeMismatch,
    /// The authenticator did not report user presence.
    #[error("user presence is required")]
    UserPresenceRequired,
    /// User verification was required but not performed.
    #[error("user verification is required")]
    UserVerificationRequired,
    /// No verifier is registered for the attestation statement format.
    #[error("unsupported attestation statement format {0:?}")]
    UnsupportedAttestationFormat(String),
    /// An attestation or assertion signature did not verify.
    #[error("signature does not verify")]
    SignatureMismatch,
    /// The attestation statement lacks a field its format requires.
    #[error("attestation statement is missing {0:?}")]
    MissingField(&'static str),
    /// An attestation certificate extension is missing or inconsistent.
    #[error("attestation certificate extension {0} does not match")]
    InvalidCertificateExtension(&'static str),
    /// The attestation statement is invalid for another reason.
    #[error("invalid attestation statement: {0}")]
    InvalidAttestation(#[source] AttestationError),
    /// The attestation is valid but does not lead to a trusted anchor.
    #[error("attestation is not trusted: {reason}")]
    AttestationNotTrusted {
        /// What the trust path evaluation rejected
        #[source]
        reason: TrustError,
    },
    /// The signature counter did not increase, the credential may have been cloned.
    #[error("signature counter went from {previous} to {received}, possible cloned authenticator")]
    CloneDetected {
        /// Counter stored for the credential
        previous: u32,
        /// Counter reported by the authenticator
        received: u32,
    },
    /// An extension output was not requested or is inconsistent with its input.
    #[error("unprocessable extension output: {0}")]
    UnprocessableExtension(String),
    /// The credential is not registered or not allowed for this ceremony.
    #[error("credential not found")]
    CredentialNotFound,
    /// The token binding reported by the client does not match the connection.
    #[error("token binding does not match")]
    TokenBindingMismatch,
    /// The credential algorithm is not one the relying party asked for.
    #[error("credential algorithm {0} is not allowed")]
    AlgorithmNotAllowed(i64),
    /// A credential with the same ID is already registered.
    #[error("credential is already registered")]
    CredentialAlreadyRegistered,
    /// The assertion's user handle is not the credential owner's.
    #[error("user handle does not match the credential owner")]
    UserHandleMismatch,
    /// The credential repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AttestationError> for CeremonyError {
    fn from(e: AttestationError) -> Self {
        match e {
            AttestationError::UnsupportedAttestationFormat(format) => {
                Self::UnsupportedAttestationFormat(format)
            }
            AttestationError::MissingField(field) => Self::MissingField(field),
            AttestationError::SignatureMismatch => Self::SignatureMismatch,
            AttestationError::InvalidCertificateExtension(extension) => {
                Self::InvalidCertificateExtension(extension)
            }
            AttestationError::Decode(e) => e.into(),
            other => Self::InvalidAttestation(other),
        }
    }
}

impl From<TrustError> for CeremonyError {
    fn from(reason: TrustError) -> Self {
        Self::AttestationNotTrusted { reason }
    }
}

impl From<DecodeError> for CeremonyError {
    fn from(e: DecodeError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

impl From<CoseKeyError> for CeremonyError {
    fn from(e: CoseKeyError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

impl From<serde_json::Error> for CeremonyError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedInput(format!("client data: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attestation_errors_keep_their_category() {
        assert_eq!(
            CeremonyError::from(AttestationError::MissingField("sig")),
            CeremonyError::MissingField("sig")
        );
        assert_eq!(
            CeremonyError::from(AttestationError::SignatureMismatch),
            CeremonyError::SignatureMismatch
        );
        assert_eq!(
            CeremonyError::from(AttestationError::UnsupportedAttestationFormat("x".into())),
            CeremonyError::UnsupportedAttestationFormat("x".into())
        );
        assert!(matches!(
            CeremonyError::from(AttestationError::Decode(DecodeError::TruncatedInput)),
            CeremonyError::MalformedInput(_)
        ));
        assert_eq!(
            CeremonyError::from(AttestationError::CredentialKeyMismatch),
            CeremonyError::InvalidAttestation(AttestationError::CredentialKeyMismatch)
        );
    }

    #[test]
    fn trust_errors_are_not_trusted() {
        assert_eq!(
            CeremonyError::from(TrustError::UntrustedChain),
            CeremonyError::AttestationNotTrusted {
                reason: TrustError::UntrustedChain
            }
        );
    }
}
