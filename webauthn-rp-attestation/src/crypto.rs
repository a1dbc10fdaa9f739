//! Signature verification for the key types found in credentials and attestation certificates.

use coset::iana::{self, EnumI64};
use p256::{
    ecdsa::signature::{self, Verifier},
    pkcs8::DecodePublicKey,
};
use rsa::{BigUint, RsaPublicKey};
use sha2::{
    digest::{const_oid::AssociatedOid, FixedOutputReset},
    Digest, Sha256, Sha384, Sha512,
};
use webauthn_rp_types::authenticator::CredentialPublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::{x509::oids, AttestationError};

/// A public key able to verify attestation or assertion signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// NIST P-256
    P256(p256::ecdsa::VerifyingKey),
    /// NIST P-384
    P384(p384::ecdsa::VerifyingKey),
    /// RSA of any size the `rsa` crate accepts
    Rsa(RsaPublicKey),
    /// Ed25519
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl PublicKey {
    /// Build a verifying key from a decoded credential public key.
    pub fn from_credential_key(key: &CredentialPublicKey) -> Result<Self, AttestationError> {
        match key {
            CredentialPublicKey::Ec2 { crv, .. } => {
                let point = key.ec_point().unwrap_or_default();
                match crv {
                    iana::EllipticCurve::P_256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                        .map(Self::P256)
                        .map_err(|_| AttestationError::SignatureMismatch),
                    iana::EllipticCurve::P_384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                        .map(Self::P384)
                        .map_err(|_| AttestationError::SignatureMismatch),
                    _ => Err(AttestationError::UnsupportedAlgorithm(
                        key.algorithm().to_i64(),
                    )),
                }
            }
            CredentialPublicKey::Rsa { n, e, .. } => {
                RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
                    .map(Self::Rsa)
                    .map_err(|_| AttestationError::SignatureMismatch)
            }
            CredentialPublicKey::Okp { x, .. } => {
                let x: &[u8; 32] = x
                    .as_slice()
                    .try_into()
                    .map_err(|_| AttestationError::SignatureMismatch)?;
                ed25519_dalek::VerifyingKey::from_bytes(x)
                    .map(Self::Ed25519)
                    .map_err(|_| AttestationError::SignatureMismatch)
            }
        }
    }

    /// Build a verifying key from a certificate's subject public key info.
    pub fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<Self, AttestationError> {
        let algorithm = &spki.algorithm.algorithm;
        if *algorithm == oids::EC_PUBLIC_KEY {
            p256::ecdsa::VerifyingKey::from_public_key_der(spki.raw)
                .map(Self::P256)
                .or_else(|_| {
                    p384::ecdsa::VerifyingKey::from_public_key_der(spki.raw).map(Self::P384)
                })
                .map_err(|_| {
                    AttestationError::InvalidCertificate("unsupported EC public key".into())
                })
        } else if *algorithm == oids::RSA_ENCRYPTION {
            RsaPublicKey::from_public_key_der(spki.raw)
                .map(Self::Rsa)
                .map_err(|_| AttestationError::InvalidCertificate("invalid RSA public key".into()))
        } else if *algorithm == oids::ED25519 {
            let raw: &[u8] = &spki.subject_public_key.data;
            let raw: &[u8; 32] = raw.try_into().map_err(|_| {
                AttestationError::InvalidCertificate("invalid Ed25519 public key".into())
            })?;
            ed25519_dalek::VerifyingKey::from_bytes(raw)
                .map(Self::Ed25519)
                .map_err(|_| {
                    AttestationError::InvalidCertificate("invalid Ed25519 public key".into())
                })
        } else {
            Err(AttestationError::InvalidCertificate(format!(
                "unsupported public key algorithm {algorithm}"
            )))
        }
    }

    /// Whether this is the same key as `credential_key`.
    pub fn matches(&self, credential_key: &CredentialPublicKey) -> bool {
        Self::from_credential_key(credential_key).is_ok_and(|key| key == *self)
    }

    /// Verify `signature` over `data` using `alg`.
    ///
    /// ECDSA signatures are expected DER encoded, as WebAuthn mandates.
    pub fn verify(
        &self,
        alg: iana::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), AttestationError> {
        let verified = match (self, alg) {
            (Self::P256(key), iana::Algorithm::ES256) => {
                p256::ecdsa::DerSignature::from_bytes(signature)
                    .and_then(|sig| key.verify(data, &sig))
            }
            (Self::P384(key), iana::Algorithm::ES384) => {
                p384::ecdsa::DerSignature::from_bytes(signature)
                    .and_then(|sig| key.verify(data, &sig))
            }
            (Self::Rsa(key), iana::Algorithm::RS256) => pkcs1v15::<Sha256>(key, data, signature),
            (Self::Rsa(key), iana::Algorithm::RS384) => pkcs1v15::<Sha384>(key, data, signature),
            (Self::Rsa(key), iana::Algorithm::RS512) => pkcs1v15::<Sha512>(key, data, signature),
            (Self::Rsa(key), iana::Algorithm::PS256) => pss::<Sha256>(key, data, signature),
            (Self::Rsa(key), iana::Algorithm::PS384) => pss::<Sha384>(key, data, signature),
            (Self::Rsa(key), iana::Algorithm::PS512) => pss::<Sha512>(key, data, signature),
            (Self::Ed25519(key), iana::Algorithm::EdDSA) => {
                ed25519_dalek::Signature::from_slice(signature)
                    .and_then(|sig| key.verify(data, &sig))
            }
            _ => return Err(AttestationError::UnsupportedAlgorithm(alg.to_i64())),
        };
        verified.map_err(|_| AttestationError::SignatureMismatch)
    }
}

fn pkcs1v15<D>(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> signature::Result<()>
where
    D: Digest + AssociatedOid,
{
    let key = rsa::pkcs1v15::VerifyingKey::<D>::new(key.clone());
    let signature = rsa::pkcs1v15::Signature::try_from(signature)?;
    key.verify(data, &signature)
}

fn pss<D>(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> signature::Result<()>
where
    D: Digest + FixedOutputReset,
{
    let key = rsa::pss::VerifyingKey::<D>::new(key.clone());
    let signature = rsa::pss::Signature::try_from(signature)?;
    key.verify(data, &signature)
}

/// Digest `data` with the hash function `alg` signs with.
pub fn digest(alg: iana::Algorithm, data: &[u8]) -> Result<Vec<u8>, AttestationError> {
    match alg {
        iana::Algorithm::ES256 | iana::Algorithm::RS256 | iana::Algorithm::PS256 => {
            Ok(Sha256::digest(data).to_vec())
        }
        iana::Algorithm::ES384 | iana::Algorithm::RS384 | iana::Algorithm::PS384 => {
            Ok(Sha384::digest(data).to_vec())
        }
        iana::Algorithm::ES512 | iana::Algorithm::RS512 | iana::Algorithm::PS512 => {
            Ok(Sha512::digest(data).to_vec())
        }
        _ => Err(AttestationError::UnsupportedAlgorithm(alg.to_i64())),
    }
}
