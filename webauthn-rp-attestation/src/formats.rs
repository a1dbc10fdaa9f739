//! Attestation statement formats.
//!
//! Every verifier follows the same order: read and type check the statement fields it needs,
//! then parse certificates, then verify signatures and certificate requirements. A statement
//! missing a field never reaches certificate parsing.

use ciborium::value::Value;
use coset::iana::{self, EnumI64};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AttestedCredentialData, AuthenticatorData},
    trust::TrustPath,
    webauthn::AttestationFormat,
    Bytes,
};

use crate::AttestationError;

mod android_key;
mod android_safetynet;
mod apple;
mod fido_u2f;
mod none;
mod packed;
mod tpm;

pub use self::{
    android_key::AndroidKeyAttestation,
    android_safetynet::{AndroidSafetyNetAttestation, SafetyNetPolicy},
    apple::AppleAttestation,
    fido_u2f::FidoU2fAttestation,
    none::NoneAttestation,
    packed::PackedAttestation,
    tpm::TpmAttestation,
};

/// Verification of one attestation statement format.
pub trait AttestationStatementVerifier {
    /// The format this verifier handles.
    fn format(&self) -> AttestationFormat;

    /// Verify `statement` over the exact authenticator data bytes and client data hash, and
    /// return how the attestation can be trusted.
    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError>;
}

/// One verifier per attestation statement format.
#[derive(Debug, Clone)]
pub enum Verifier {
    /// `none`
    None(NoneAttestation),
    /// `fido-u2f`
    FidoU2f(FidoU2fAttestation),
    /// `packed`
    Packed(PackedAttestation),
    /// `tpm`
    Tpm(TpmAttestation),
    /// `android-key`
    AndroidKey(AndroidKeyAttestation),
    /// `android-safetynet`
    AndroidSafetyNet(AndroidSafetyNetAttestation),
    /// `apple`
    Apple(AppleAttestation),
}

impl AttestationStatementVerifier for Verifier {
    fn format(&self) -> AttestationFormat {
        match self {
            Self::None(v) => v.format(),
            Self::FidoU2f(v) => v.format(),
            Self::Packed(v) => v.format(),
            Self::Tpm(v) => v.format(),
            Self::AndroidKey(v) => v.format(),
            Self::AndroidSafetyNet(v) => v.format(),
            Self::Apple(v) => v.format(),
        }
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        match self {
            Self::None(v) => v.verify(statement, auth_data, client_data_hash),
            Self::FidoU2f(v) => v.verify(statement, auth_data, client_data_hash),
            Self::Packed(v) => v.verify(statement, auth_data, client_data_hash),
            Self::Tpm(v) => v.verify(statement, auth_data, client_data_hash),
            Self::AndroidKey(v) => v.verify(statement, auth_data, client_data_hash),
            Self::AndroidSafetyNet(v) => v.verify(statement, auth_data, client_data_hash),
            Self::Apple(v) => v.verify(statement, auth_data, client_data_hash),
        }
    }
}

macro_rules! impl_from_verifier {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Verifier {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )+
    };
}

impl_from_verifier!(
    None(NoneAttestation),
    FidoU2f(FidoU2fAttestation),
    Packed(PackedAttestation),
    Tpm(TpmAttestation),
    AndroidKey(AndroidKeyAttestation),
    AndroidSafetyNet(AndroidSafetyNetAttestation),
    Apple(AppleAttestation),
);

fn field<'a>(
    statement: &'a AttestationStatement,
    name: &'static str,
) -> Result<&'a Value, AttestationError> {
    statement
        .get(name)
        .ok_or(AttestationError::MissingField(name))
}

/// A required byte string field.
pub(crate) fn bytes<'a>(
    statement: &'a AttestationStatement,
    name: &'static str,
) -> Result<&'a [u8], AttestationError> {
    match field(statement, name)? {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err(AttestationError::InvalidField(name)),
    }
}

/// An optional byte string field.
pub(crate) fn optional_bytes<'a>(
    statement: &'a AttestationStatement,
    name: &'static str,
) -> Result<Option<&'a [u8]>, AttestationError> {
    match statement.get(name) {
        None => Ok(None),
        Some(Value::Bytes(bytes)) => Ok(Some(bytes)),
        Some(_) => Err(AttestationError::InvalidField(name)),
    }
}

/// A required text field.
pub(crate) fn text<'a>(
    statement: &'a AttestationStatement,
    name: &'static str,
) -> Result<&'a str, AttestationError> {
    match field(statement, name)? {
        Value::Text(text) => Ok(text),
        _ => Err(AttestationError::InvalidField(name)),
    }
}

/// The `alg` field as a COSE algorithm.
pub(crate) fn algorithm(
    statement: &AttestationStatement,
) -> Result<iana::Algorithm, AttestationError> {
    let Value::Integer(alg) = field(statement, "alg")? else {
        return Err(AttestationError::InvalidField("alg"));
    };
    let alg = i64::try_from(*alg).map_err(|_| AttestationError::InvalidField("alg"))?;
    iana::Algorithm::from_i64(alg).ok_or(AttestationError::UnsupportedAlgorithm(alg))
}

/// The optional `x5c` field: a non empty array of DER certificates, leaf first.
pub(crate) fn certificates(
    statement: &AttestationStatement,
) -> Result<Option<Vec<Bytes>>, AttestationError> {
    let Some(x5c) = statement.get("x5c") else {
        return Ok(None);
    };
    let Value::Array(items) = x5c else {
        return Err(AttestationError::InvalidField("x5c"));
    };
    if items.is_empty() {
        return Err(AttestationError::InvalidField("x5c"));
    }
    items
        .iter()
        .map(|item| match item {
            Value::Bytes(der) => Ok(Bytes::from(der.as_slice())),
            _ => Err(AttestationError::InvalidField("x5c")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// The `x5c` field when the format requires it.
pub(crate) fn required_certificates(
    statement: &AttestationStatement,
) -> Result<Vec<Bytes>, AttestationError> {
    certificates(statement)?.ok_or(AttestationError::MissingField("x5c"))
}

pub(crate) fn attested_credential(
    auth_data: &AuthenticatorData,
) -> Result<&AttestedCredentialData, AttestationError> {
    auth_data
        .attested_credential_data()
        .ok_or(AttestationError::MissingField("attestedCredentialData"))
}

/// `authenticatorData || clientDataHash`, over the exact bytes received.
pub(crate) fn signed_data(auth_data: &AuthenticatorData, client_data_hash: &[u8; 32]) -> Vec<u8> {
    [auth_data.raw(), client_data_hash.as_slice()].concat()
}

#[cfg(test)]
pub(crate) mod fixtures;
