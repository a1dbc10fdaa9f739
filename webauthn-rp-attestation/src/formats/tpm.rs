//! The `tpm` format.
//!
//! A TPM does not sign the authenticator data directly. It certifies the credential key with an
//! attestation identity key (AIK): `pubArea` is the TPM's description of the credential key,
//! `certInfo` is a `TPMS_ATTEST` naming that key and carrying a hash of the authenticator data
//! and client data in `extraData`, and `sig` is the AIK signature over `certInfo`.

use coset::iana;
use nom::{
    bytes::complete::take,
    combinator::all_consuming,
    multi::length_data,
    number::complete::{be_u16, be_u32, be_u64},
    sequence::tuple,
    IResult,
};
use sha2::{Digest, Sha256, Sha384, Sha512};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData, CredentialPublicKey},
    trust::{EcdaaTrustPath, TrustPath},
    webauthn::AttestationFormat,
    Bytes,
};
use x509_parser::{certificate::X509Certificate, extensions::GeneralName};

use super::{
    algorithm, attested_credential, bytes, certificates, optional_bytes, signed_data, text,
    AttestationStatementVerifier,
};
use crate::{
    crypto,
    x509::{self, oids},
    AttestationError,
};

const TPM_GENERATED_VALUE: u32 = 0xff54_4347;
const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

const TPM_ALG_RSA: u16 = 0x0001;
const TPM_ALG_SHA1: u16 = 0x0004;
const TPM_ALG_SHA256: u16 = 0x000b;
const TPM_ALG_SHA384: u16 = 0x000c;
const TPM_ALG_SHA512: u16 = 0x000d;
const TPM_ALG_NULL: u16 = 0x0010;
const TPM_ALG_ECC: u16 = 0x0023;

const TPM_ECC_NIST_P256: u16 = 0x0003;
const TPM_ECC_NIST_P384: u16 = 0x0004;
const TPM_ECC_NIST_P521: u16 = 0x0005;

/// An RSA `pubArea` with exponent 0 uses the default exponent.
const TPM_RSA_DEFAULT_EXPONENT: u64 = 65537;

/// TPM vendor identifiers from the TCG vendor ID registry, plus the FIDO conformance test vendor.
const TPM_MANUFACTURERS: &[&str] = &[
    "id:414D4400", // AMD
    "id:41544D4C", // Atmel
    "id:4252434D", // Broadcom
    "id:4353434F", // Cisco
    "id:464C5953", // Flyslice
    "id:474F4F47", // Google
    "id:48504500", // HPE
    "id:48504900", // HP
    "id:49424D00", // IBM
    "id:49465800", // Infineon
    "id:494E5443", // Intel
    "id:4C454E00", // Lenovo
    "id:4D534654", // Microsoft
    "id:4E534D20", // National Semiconductor
    "id:4E545A00", // Nationz
    "id:4E544300", // Nuvoton
    "id:51434F4D", // Qualcomm
    "id:524F4343", // Fuzhou Rockchip
    "id:534D5343", // SMSC
    "id:534D534E", // Samsung
    "id:534E5300", // Sinosun
    "id:53544D20", // ST Microelectronics
    "id:54584E00", // Texas Instruments
    "id:57454300", // Winbond
    "id:FFFFF1D0", // FIDO Alliance conformance testing
];

/// Verifier for TPM 2.0 attestation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TpmAttestation;

impl AttestationStatementVerifier for TpmAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Tpm
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let ver = text(statement, "ver")?;
        let alg = algorithm(statement)?;
        let sig = bytes(statement, "sig")?;
        let cert_info_bytes = bytes(statement, "certInfo")?;
        let pub_area_bytes = bytes(statement, "pubArea")?;
        let x5c = certificates(statement)?;
        let ecdaa_key_id = optional_bytes(statement, "ecdaaKeyId")?;
        let credential = attested_credential(auth_data)?;

        if ver != "2.0" {
            return Err(AttestationError::InvalidField("ver"));
        }

        let (_, pub_area) = all_consuming(PubArea::parse)(pub_area_bytes)
            .map_err(|_| AttestationError::InvalidField("pubArea"))?;
        let (_, cert_info) = all_consuming(CertInfo::parse)(cert_info_bytes)
            .map_err(|_| AttestationError::InvalidField("certInfo"))?;

        if !pub_area.key.matches(credential.credential_public_key()) {
            return Err(AttestationError::CredentialKeyMismatch);
        }

        if cert_info.magic != TPM_GENERATED_VALUE {
            return Err(AttestationError::InvalidField("certInfo"));
        }
        if cert_info.ty != TPM_ST_ATTEST_CERTIFY {
            return Err(AttestationError::InvalidField("certInfo"));
        }
        let att_to_be_signed = signed_data(auth_data, client_data_hash);
        if cert_info.extra_data != crypto::digest(alg, &att_to_be_signed)?.as_slice() {
            log::debug!("TPM extraData does not hash the authenticator and client data");
            return Err(AttestationError::InvalidField("certInfo"));
        }
        let name = name_of(pub_area.name_alg, pub_area_bytes)
            .ok_or(AttestationError::InvalidField("pubArea"))?;
        if cert_info.attested_name != name.as_slice() {
            log::debug!("TPM certInfo does not name the pubArea");
            return Err(AttestationError::InvalidField("certInfo"));
        }

        match (x5c, ecdaa_key_id) {
            (Some(x5c), None) => {
                let aik = x509::parse(&x5c[0])?;
                x509::public_key(&aik)?.verify(alg, cert_info_bytes, sig)?;
                check_aik_certificate(&aik)?;
                x509::check_aaguid(&aik, &credential.aaguid)?;
                Ok(TrustPath::Certificate(x5c))
            }
            (None, Some(key_id)) => Ok(TrustPath::Ecdaa(EcdaaTrustPath {
                key_id: Bytes::from(key_id),
                signature: Bytes::from(sig),
                signed_data: Bytes::from(cert_info_bytes),
                algorithm: alg,
            })),
            (Some(_), Some(_)) => Err(AttestationError::InvalidField("ecdaaKeyId")),
            (None, None) => Err(AttestationError::MissingField("x5c")),
        }
    }
}

/// The TPM name of an object: the name algorithm followed by the digest of its public area.
fn name_of(name_alg: u16, pub_area: &[u8]) -> Option<Vec<u8>> {
    let digest = match name_alg {
        TPM_ALG_SHA1 => sha1::Sha1::digest(pub_area).to_vec(),
        TPM_ALG_SHA256 => Sha256::digest(pub_area).to_vec(),
        TPM_ALG_SHA384 => Sha384::digest(pub_area).to_vec(),
        TPM_ALG_SHA512 => Sha512::digest(pub_area).to_vec(),
        _ => return None,
    };
    Some(name_alg.to_be_bytes().into_iter().chain(digest).collect())
}

fn check_aik_certificate(aik: &X509Certificate<'_>) -> Result<(), AttestationError> {
    let invalid = |reason: &str| Err(AttestationError::InvalidCertificate(reason.into()));

    if !x509::is_v3(aik) {
        return invalid("AIK certificate must be version 3");
    }
    if aik.subject().iter().next().is_some() {
        return invalid("AIK certificate subject must be empty");
    }

    let san = match aik.subject_alternative_name() {
        Ok(Some(san)) => san,
        Ok(None) => return invalid("AIK certificate has no subject alternative name"),
        Err(e) => return Err(AttestationError::InvalidCertificate(e.to_string())),
    };
    let (mut manufacturer, mut model, mut version) = (None, None, None);
    for general_name in &san.value.general_names {
        let GeneralName::DirectoryName(name) = general_name else {
            continue;
        };
        for attr in name.iter_attributes() {
            let value = attr.as_str().ok();
            if *attr.attr_type() == oids::TCG_AT_TPM_MANUFACTURER {
                manufacturer = value;
            } else if *attr.attr_type() == oids::TCG_AT_TPM_MODEL {
                model = value;
            } else if *attr.attr_type() == oids::TCG_AT_TPM_VERSION {
                version = value;
            }
        }
    }
    let Some(manufacturer) = manufacturer else {
        return invalid("AIK certificate does not name the TPM manufacturer");
    };
    if !TPM_MANUFACTURERS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(manufacturer))
    {
        log::warn!("unknown TPM manufacturer {manufacturer}");
        return invalid("unknown TPM manufacturer");
    }
    if model.map_or(true, str::is_empty) || version.map_or(true, str::is_empty) {
        return invalid("AIK certificate does not name the TPM model and version");
    }

    let is_aik = match aik.extended_key_usage() {
        Ok(Some(eku)) => eku.value.other.contains(&oids::TCG_KP_AIK_CERTIFICATE),
        _ => false,
    };
    if !is_aik {
        return invalid("AIK certificate lacks the tcg-kp-AIKCertificate key purpose");
    }
    if aik.is_ca() {
        return invalid("AIK certificate must not be a CA");
    }
    Ok(())
}

/// The key described by a `TPMT_PUBLIC`.
#[derive(Debug, PartialEq, Eq)]
enum TpmPublicKey<'a> {
    Rsa { exponent: u32, modulus: &'a [u8] },
    Ecc { curve: u16, x: &'a [u8], y: &'a [u8] },
}

impl TpmPublicKey<'_> {
    fn matches(&self, key: &CredentialPublicKey) -> bool {
        match (self, key) {
            (Self::Rsa { exponent, modulus }, CredentialPublicKey::Rsa { n, e, .. }) => {
                let exponent = match *exponent {
                    0 => TPM_RSA_DEFAULT_EXPONENT,
                    other => u64::from(other),
                };
                let e = e.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
                strip_leading_zeros(modulus) == strip_leading_zeros(n) && exponent == e
            }
            (Self::Ecc { curve, x, y }, CredentialPublicKey::Ec2 { crv, x: cx, y: cy, .. }) => {
                let curve = match *curve {
                    TPM_ECC_NIST_P256 => iana::EllipticCurve::P_256,
                    TPM_ECC_NIST_P384 => iana::EllipticCurve::P_384,
                    TPM_ECC_NIST_P521 => iana::EllipticCurve::P_521,
                    _ => return false,
                };
                curve == *crv && *x == cx.as_slice() && *y == cy.as_slice()
            }
            _ => false,
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// `TPMT_PUBLIC`, as far as attestation needs it.
#[derive(Debug)]
struct PubArea<'a> {
    name_alg: u16,
    key: TpmPublicKey<'a>,
}

impl<'a> PubArea<'a> {
    fn parse(i: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (i, (ty, name_alg, _object_attributes, _auth_policy)) =
            tuple((be_u16, be_u16, be_u32, tpm2b))(i)?;
        match ty {
            TPM_ALG_RSA => {
                let (i, (_symmetric, _scheme, _key_bits, exponent, modulus)) =
                    tuple((sym_def_object, scheme, be_u16, be_u32, tpm2b))(i)?;
                Ok((
                    i,
                    PubArea {
                        name_alg,
                        key: TpmPublicKey::Rsa { exponent, modulus },
                    },
                ))
            }
            TPM_ALG_ECC => {
                let (i, (_symmetric, _scheme, curve, _kdf, x, y)) =
                    tuple((sym_def_object, scheme, be_u16, scheme, tpm2b, tpm2b))(i)?;
                Ok((
                    i,
                    PubArea {
                        name_alg,
                        key: TpmPublicKey::Ecc { curve, x, y },
                    },
                ))
            }
            _ => Err(nom::Err::Error(nom::error::Error::new(
                i,
                nom::error::ErrorKind::Switch,
            ))),
        }
    }
}

/// `TPMS_ATTEST` carrying a `TPMS_CERTIFY_INFO`.
#[derive(Debug)]
struct CertInfo<'a> {
    magic: u32,
    ty: u16,
    extra_data: &'a [u8],
    attested_name: &'a [u8],
}

impl<'a> CertInfo<'a> {
    fn parse(i: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (i, (magic, ty, _qualified_signer, extra_data)) =
            tuple((be_u32, be_u16, tpm2b, tpm2b))(i)?;
        // clockInfo: clock, resetCount, restartCount, safe
        let (i, _clock_info) = take(17usize)(i)?;
        let (i, _firmware_version) = be_u64(i)?;
        let (i, (attested_name, _qualified_name)) = tuple((tpm2b, tpm2b))(i)?;
        Ok((
            i,
            CertInfo {
                magic,
                ty,
                extra_data,
                attested_name,
            },
        ))
    }
}

/// A `TPM2B_*` sized buffer.
fn tpm2b(i: &[u8]) -> IResult<&[u8], &[u8]> {
    length_data(be_u16)(i)
}

/// `TPMT_SYM_DEF_OBJECT`: an algorithm, followed by key bits and mode unless it is null.
fn sym_def_object(i: &[u8]) -> IResult<&[u8], u16> {
    let (i, alg) = be_u16(i)?;
    if alg == TPM_ALG_NULL {
        return Ok((i, alg));
    }
    let (i, _) = tuple((be_u16, be_u16))(i)?;
    Ok((i, alg))
}

/// A signing or KDF scheme: an algorithm, followed by a hash algorithm unless it is null.
fn scheme(i: &[u8]) -> IResult<&[u8], u16> {
    let (i, alg) = be_u16(i)?;
    if alg == TPM_ALG_NULL {
        return Ok((i, alg));
    }
    let (i, _hash_alg) = be_u16(i)?;
    Ok((i, alg))
}
