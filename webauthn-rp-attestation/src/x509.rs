//! Certificate helpers on top of `x509-parser`.

use coset::iana;
use data_encoding::HEXLOWER;
use sha1::{Digest, Sha1};
use webauthn_rp_types::authenticator::Aaguid;
use x509_parser::{certificate::X509Certificate, x509::X509Version};

use crate::{crypto::PublicKey, AttestationError};

pub(crate) mod oids {
    use der_parser::oid::Oid;

    pub const EC_PUBLIC_KEY: Oid<'static> = der_parser::oid!(1.2.840 .10045 .2 .1);
    pub const RSA_ENCRYPTION: Oid<'static> = der_parser::oid!(1.2.840 .113549 .1 .1 .1);
    pub const ED25519: Oid<'static> = der_parser::oid!(1.3.101 .112);

    pub const ECDSA_WITH_SHA256: Oid<'static> = der_parser::oid!(1.2.840 .10045 .4 .3 .2);
    pub const ECDSA_WITH_SHA384: Oid<'static> = der_parser::oid!(1.2.840 .10045 .4 .3 .3);
    pub const SHA256_WITH_RSA: Oid<'static> = der_parser::oid!(1.2.840 .113549 .1 .1 .11);
    pub const SHA384_WITH_RSA: Oid<'static> = der_parser::oid!(1.2.840 .113549 .1 .1 .12);
    pub const SHA512_WITH_RSA: Oid<'static> = der_parser::oid!(1.2.840 .113549 .1 .1 .13);

    /// id-fido-gen-ce-aaguid
    pub const FIDO_GEN_CE_AAGUID: Oid<'static> = der_parser::oid!(1.3.6 .1 .4 .1 .45724 .1 .1 .4);
    /// Android key attestation KeyDescription
    pub const ANDROID_KEY_DESCRIPTION: Oid<'static> =
        der_parser::oid!(1.3.6 .1 .4 .1 .11129 .2 .1 .17);
    /// Apple anonymous attestation nonce
    pub const APPLE_NONCE: Oid<'static> = der_parser::oid!(1.2.840 .113635 .100 .8 .2);
    /// tcg-kp-AIKCertificate
    pub const TCG_KP_AIK_CERTIFICATE: Oid<'static> = der_parser::oid!(2.23.133 .8 .3);

    pub const TCG_AT_TPM_MANUFACTURER: Oid<'static> = der_parser::oid!(2.23.133 .2 .1);
    pub const TCG_AT_TPM_MODEL: Oid<'static> = der_parser::oid!(2.23.133 .2 .2);
    pub const TCG_AT_TPM_VERSION: Oid<'static> = der_parser::oid!(2.23.133 .2 .3);
}

/// Parse a single DER certificate, rejecting trailing bytes.
pub(crate) fn parse(der: &[u8]) -> Result<X509Certificate<'_>, AttestationError> {
    match x509_parser::parse_x509_certificate(der) {
        Ok((rest, cert)) if rest.is_empty() => Ok(cert),
        Ok(_) => Err(AttestationError::InvalidCertificate(
            "trailing bytes after certificate".into(),
        )),
        Err(e) => Err(AttestationError::InvalidCertificate(e.to_string())),
    }
}

pub(crate) fn public_key(cert: &X509Certificate<'_>) -> Result<PublicKey, AttestationError> {
    PublicKey::from_spki(cert.public_key())
}

pub(crate) fn is_v3(cert: &X509Certificate<'_>) -> bool {
    cert.version() == X509Version::V3
}

/// The value of the FIDO AAGUID extension, if the certificate carries one.
pub(crate) fn aaguid_extension(
    cert: &X509Certificate<'_>,
) -> Result<Option<Aaguid>, AttestationError> {
    let Some(ext) = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid == oids::FIDO_GEN_CE_AAGUID)
    else {
        return Ok(None);
    };
    let invalid = || AttestationError::InvalidCertificateExtension("id-fido-gen-ce-aaguid");
    if ext.critical {
        return Err(invalid());
    }
    let (_, octets) = der_parser::der::parse_der_octetstring(ext.value).map_err(|_| invalid())?;
    let octets = octets.as_slice().map_err(|_| invalid())?;
    Aaguid::try_from(octets).map(Some).map_err(|_| invalid())
}

/// Check an AAGUID extension, when present, against the authenticator's AAGUID.
pub(crate) fn check_aaguid(
    cert: &X509Certificate<'_>,
    aaguid: &Aaguid,
) -> Result<(), AttestationError> {
    match aaguid_extension(cert)? {
        Some(cert_aaguid) if cert_aaguid != *aaguid => {
            log::warn!("attestation certificate is for {cert_aaguid}, authenticator claims {aaguid}");
            Err(AttestationError::InvalidCertificateExtension(
                "id-fido-gen-ce-aaguid",
            ))
        }
        _ => Ok(()),
    }
}

/// Lower case hex SHA-1 of the subject public key, how metadata identifies U2F attestation
/// certificates.
pub(crate) fn key_identifier(cert: &X509Certificate<'_>) -> String {
    let key: &[u8] = &cert.public_key().subject_public_key.data;
    HEXLOWER.encode(&Sha1::digest(key))
}

/// Whether `cert` names `issuer` as its issuer and carries a valid signature from it.
pub(crate) fn is_issued_by(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> bool {
    if cert.issuer().as_raw() != issuer.subject().as_raw() {
        return false;
    }
    let Some(alg) = signature_algorithm(cert) else {
        log::debug!(
            "unsupported certificate signature algorithm {}",
            cert.signature_algorithm.algorithm
        );
        return false;
    };
    let signature: &[u8] = &cert.signature_value.data;
    public_key(issuer)
        .and_then(|key| key.verify(alg, cert.tbs_certificate.as_ref(), signature))
        .is_ok()
}

/// Whether `issuer` is a CA allowed to sign a path with `intermediates` CA certificates below it.
///
/// Certificates without basic constraints are not CAs.
pub(crate) fn may_issue(issuer: &X509Certificate<'_>, intermediates: usize) -> bool {
    let Ok(Some(constraints)) = issuer.basic_constraints() else {
        return false;
    };
    let constraints = constraints.value;
    constraints.ca
        && constraints.path_len_constraint.map_or(true, |limit| {
            u32::try_from(intermediates).is_ok_and(|below| below <= limit)
        })
}

fn signature_algorithm(cert: &X509Certificate<'_>) -> Option<iana::Algorithm> {
    let oid = &cert.signature_algorithm.algorithm;
    [
        (oids::ECDSA_WITH_SHA256, iana::Algorithm::ES256),
        (oids::ECDSA_WITH_SHA384, iana::Algorithm::ES384),
        (oids::SHA256_WITH_RSA, iana::Algorithm::RS256),
        (oids::SHA384_WITH_RSA, iana::Algorithm::RS384),
        (oids::SHA512_WITH_RSA, iana::Algorithm::RS512),
        (oids::ED25519, iana::Algorithm::EdDSA),
    ]
    .into_iter()
    .find_map(|(known, alg)| (*oid == known).then_some(alg))
}

/// Whether `unix_time` lies within the certificate's validity period.
pub(crate) fn is_valid_at(cert: &X509Certificate<'_>, unix_time: i64) -> bool {
    let validity = cert.validity();
    validity.not_before.timestamp() <= unix_time && unix_time <= validity.not_after.timestamp()
}
