//! Credential public keys in `COSE_Key` form.
//!
//! Keys are decoded by hand from the CBOR map rather than through a generic deserializer: every
//! label must be an integer, appear once, and be one the key type defines. Anything else is a
//! decode failure.
//!
//! <https://www.rfc-editor.org/rfc/rfc9052#section-7>

use std::collections::BTreeMap;

use ciborium::value::{Integer, Value};
use coset::iana::{self, EnumI64};

use crate::utils::cbor;

const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;
const LABEL_N: i64 = -1;
const LABEL_E: i64 = -2;

/// Failure to decode a `COSE_Key` map into a [`CredentialPublicKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoseKeyError {
    /// The bytes were not a single well formed CBOR item.
    #[error("credential public key is not valid CBOR")]
    Cbor,
    /// The CBOR item was not a map.
    #[error("credential public key is not a CBOR map")]
    NotAMap,
    /// A map key was not an integer label.
    #[error("credential public key has a non integer label")]
    NonIntegerLabel,
    /// A label appeared more than once.
    #[error("credential public key repeats label {0}")]
    DuplicateLabel(i64),
    /// A label is not defined for this key type.
    #[error("label {0} is not allowed for this key type")]
    UnexpectedLabel(i64),
    /// A label required by the key type is missing.
    #[error("credential public key is missing label {0}")]
    MissingLabel(i64),
    /// A label holds a value of the wrong type or size.
    #[error("credential public key label {0} has an invalid value")]
    InvalidValue(i64),
    /// The `kty` is not one of EC2, OKP or RSA.
    #[error("unsupported COSE key type {0}")]
    UnsupportedKeyType(i64),
    /// The `alg` does not belong with the key type or curve.
    #[error("algorithm {alg} cannot be used with this key")]
    AlgorithmMismatch {
        /// The declared algorithm identifier
        alg: i64,
    },
}

/// A credential public key as carried in attested credential data.
///
/// Only the parameters needed to verify signatures are kept. Curve coordinate lengths are checked
/// against the curve during decoding so verifiers can rely on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPublicKey {
    /// Elliptic curve key with x and y coordinates, `kty = 2`.
    Ec2 {
        /// Signing algorithm, one of ES256, ES384 or ES512
        alg: iana::Algorithm,
        /// Curve matching the algorithm
        crv: iana::EllipticCurve,
        /// Big-endian x coordinate
        x: Vec<u8>,
        /// Big-endian y coordinate
        y: Vec<u8>,
    },
    /// RSA key, `kty = 3`.
    Rsa {
        /// Signing algorithm, one of the RSASSA-PKCS1-v1_5 or RSASSA-PSS identifiers
        alg: iana::Algorithm,
        /// Big-endian modulus
        n: Vec<u8>,
        /// Big-endian public exponent
        e: Vec<u8>,
    },
    /// Octet key pair, `kty = 1`. Only Ed25519 is accepted.
    Okp {
        /// Always EdDSA
        alg: iana::Algorithm,
        /// Always Ed25519
        crv: iana::EllipticCurve,
        /// The 32 byte public key
        x: Vec<u8>,
    },
}

impl CredentialPublicKey {
    /// The COSE algorithm this key is declared for.
    pub fn algorithm(&self) -> iana::Algorithm {
        match self {
            Self::Ec2 { alg, .. } | Self::Rsa { alg, .. } | Self::Okp { alg, .. } => *alg,
        }
    }

    /// The COSE key type of this key.
    pub fn key_type(&self) -> iana::KeyType {
        match self {
            Self::Ec2 { .. } => iana::KeyType::EC2,
            Self::Rsa { .. } => iana::KeyType::RSA,
            Self::Okp { .. } => iana::KeyType::OKP,
        }
    }

    /// Uncompressed SEC1 point (`0x04 || x || y`) for EC2 keys.
    pub fn ec_point(&self) -> Option<Vec<u8>> {
        match self {
            Self::Ec2 { x, y, .. } => Some(
                std::iter::once(0x04)
                    .chain(x.iter().copied())
                    .chain(y.iter().copied())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Decode a key from its CBOR encoding, the slice must hold exactly one CBOR item.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoseKeyError> {
        let mut input = bytes;
        let value: Value =
            ciborium::de::from_reader(&mut input).map_err(|_| CoseKeyError::Cbor)?;
        if !input.is_empty() {
            return Err(CoseKeyError::Cbor);
        }
        Self::from_cbor_value(value)
    }

    /// Decode a key from an already parsed CBOR value.
    pub fn from_cbor_value(value: Value) -> Result<Self, CoseKeyError> {
        let Value::Map(entries) = value else {
            return Err(CoseKeyError::NotAMap);
        };

        let mut params = BTreeMap::new();
        for (label, val) in entries {
            let label = match label {
                Value::Integer(i) => {
                    i64::try_from(i).map_err(|_| CoseKeyError::NonIntegerLabel)?
                }
                _ => return Err(CoseKeyError::NonIntegerLabel),
            };
            if params.insert(label, val).is_some() {
                return Err(CoseKeyError::DuplicateLabel(label));
            }
        }

        let kty = int_param(&params, LABEL_KTY)?;
        let alg_id = int_param(&params, LABEL_ALG)?;
        let alg = iana::Algorithm::from_i64(alg_id)
            .ok_or(CoseKeyError::AlgorithmMismatch { alg: alg_id })?;

        match iana::KeyType::from_i64(kty) {
            Some(iana::KeyType::EC2) => {
                only_labels(&params, &[LABEL_KTY, LABEL_ALG, LABEL_CRV, LABEL_X, LABEL_Y])?;
                let crv = curve_param(&params)?;
                let coordinate_len = match (alg, crv) {
                    (iana::Algorithm::ES256, iana::EllipticCurve::P_256) => 32,
                    (iana::Algorithm::ES384, iana::EllipticCurve::P_384) => 48,
                    (iana::Algorithm::ES512, iana::EllipticCurve::P_521) => 66,
                    _ => return Err(CoseKeyError::AlgorithmMismatch { alg: alg_id }),
                };
                let x = bytes_param(&params, LABEL_X)?;
                let y = bytes_param(&params, LABEL_Y)?;
                if x.len() != coordinate_len {
                    return Err(CoseKeyError::InvalidValue(LABEL_X));
                }
                if y.len() != coordinate_len {
                    return Err(CoseKeyError::InvalidValue(LABEL_Y));
                }
                Ok(Self::Ec2 { alg, crv, x, y })
            }
            Some(iana::KeyType::RSA) => {
                only_labels(&params, &[LABEL_KTY, LABEL_ALG, LABEL_N, LABEL_E])?;
                if !matches!(
                    alg,
                    iana::Algorithm::RS256
                        | iana::Algorithm::RS384
                        | iana::Algorithm::RS512
                        | iana::Algorithm::PS256
                        | iana::Algorithm::PS384
                        | iana::Algorithm::PS512
                ) {
                    return Err(CoseKeyError::AlgorithmMismatch { alg: alg_id });
                }
                let n = bytes_param(&params, LABEL_N)?;
                let e = bytes_param(&params, LABEL_E)?;
                if n.is_empty() {
                    return Err(CoseKeyError::InvalidValue(LABEL_N));
                }
                if e.is_empty() || e.len() > 8 {
                    return Err(CoseKeyError::InvalidValue(LABEL_E));
                }
                Ok(Self::Rsa { alg, n, e })
            }
            Some(iana::KeyType::OKP) => {
                only_labels(&params, &[LABEL_KTY, LABEL_ALG, LABEL_CRV, LABEL_X])?;
                let crv = curve_param(&params)?;
                if alg != iana::Algorithm::EdDSA || crv != iana::EllipticCurve::Ed25519 {
                    return Err(CoseKeyError::AlgorithmMismatch { alg: alg_id });
                }
                let x = bytes_param(&params, LABEL_X)?;
                if x.len() != 32 {
                    return Err(CoseKeyError::InvalidValue(LABEL_X));
                }
                Ok(Self::Okp { alg, crv, x })
            }
            _ => Err(CoseKeyError::UnsupportedKeyType(kty)),
        }
    }

    /// Canonical CBOR map for this key, labels in CTAP2 canonical order.
    pub fn to_cbor_value(&self) -> Value {
        let int = |i: i64| Value::Integer(Integer::from(i));
        let entries = match self {
            Self::Ec2 { alg, crv, x, y } => vec![
                (int(LABEL_KTY), int(iana::KeyType::EC2.to_i64())),
                (int(LABEL_ALG), int(alg.to_i64())),
                (int(LABEL_CRV), int(crv.to_i64())),
                (int(LABEL_X), Value::Bytes(x.clone())),
                (int(LABEL_Y), Value::Bytes(y.clone())),
            ],
            Self::Rsa { alg, n, e } => vec![
                (int(LABEL_KTY), int(iana::KeyType::RSA.to_i64())),
                (int(LABEL_ALG), int(alg.to_i64())),
                (int(LABEL_N), Value::Bytes(n.clone())),
                (int(LABEL_E), Value::Bytes(e.clone())),
            ],
            Self::Okp { alg, crv, x } => vec![
                (int(LABEL_KTY), int(iana::KeyType::OKP.to_i64())),
                (int(LABEL_ALG), int(alg.to_i64())),
                (int(LABEL_CRV), int(crv.to_i64())),
                (int(LABEL_X), Value::Bytes(x.clone())),
            ],
        };
        Value::Map(entries)
    }

    /// Canonical CBOR encoding of this key.
    pub fn to_vec(&self) -> Vec<u8> {
        cbor::to_vec(&self.to_cbor_value())
    }
}

fn only_labels(params: &BTreeMap<i64, Value>, allowed: &[i64]) -> Result<(), CoseKeyError> {
    match params.keys().find(|label| !allowed.contains(label)) {
        Some(label) => Err(CoseKeyError::UnexpectedLabel(*label)),
        None => Ok(()),
    }
}

fn int_param(params: &BTreeMap<i64, Value>, label: i64) -> Result<i64, CoseKeyError> {
    match params.get(&label) {
        Some(Value::Integer(i)) => i64::try_from(*i).map_err(|_| CoseKeyError::InvalidValue(label)),
        Some(_) => Err(CoseKeyError::InvalidValue(label)),
        None => Err(CoseKeyError::MissingLabel(label)),
    }
}

fn bytes_param(params: &BTreeMap<i64, Value>, label: i64) -> Result<Vec<u8>, CoseKeyError> {
    match params.get(&label) {
        Some(Value::Bytes(b)) => Ok(b.clone()),
        Some(_) => Err(CoseKeyError::InvalidValue(label)),
        None => Err(CoseKeyError::MissingLabel(label)),
    }
}

fn curve_param(params: &BTreeMap<i64, Value>) -> Result<iana::EllipticCurve, CoseKeyError> {
    let crv = int_param(params, LABEL_CRV)?;
    iana::EllipticCurve::from_i64(crv).ok_or(CoseKeyError::InvalidValue(LABEL_CRV))
}
