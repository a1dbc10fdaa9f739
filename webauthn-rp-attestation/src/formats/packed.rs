use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    trust::{EcdaaTrustPath, TrustPath},
    webauthn::AttestationFormat,
    Bytes,
};
use x509_parser::{certificate::X509Certificate, x509::AttributeTypeAndValue};

use super::{
    algorithm, attested_credential, bytes, certificates, optional_bytes, signed_data,
    AttestationStatementVerifier,
};
use crate::{crypto::PublicKey, x509, AttestationError};

/// The `packed` format, the WebAuthn optimized attestation most FIDO2 authenticators emit.
///
/// It comes in three flavours distinguished by the fields present: full attestation with an
/// `x5c` certificate path, ECDAA with an `ecdaaKeyId`, and self attestation with neither.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackedAttestation;

impl AttestationStatementVerifier for PackedAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Packed
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let alg = algorithm(statement)?;
        let sig = bytes(statement, "sig")?;
        let x5c = certificates(statement)?;
        let ecdaa_key_id = optional_bytes(statement, "ecdaaKeyId")?;
        let credential = attested_credential(auth_data)?;
        let data = signed_data(auth_data, client_data_hash);

        match (x5c, ecdaa_key_id) {
            (Some(_), Some(_)) => Err(AttestationError::InvalidField("ecdaaKeyId")),
            (Some(x5c), None) => {
                let leaf = x509::parse(&x5c[0])?;
                x509::public_key(&leaf)?.verify(alg, &data, sig)?;
                check_certificate(&leaf)?;
                x509::check_aaguid(&leaf, &credential.aaguid)?;
                Ok(TrustPath::Certificate(x5c))
            }
            (None, Some(key_id)) => Ok(TrustPath::Ecdaa(EcdaaTrustPath {
                key_id: Bytes::from(key_id),
                signature: Bytes::from(sig),
                signed_data: data.into(),
                algorithm: alg,
            })),
            (None, None) => {
                let key = credential.credential_public_key();
                if key.algorithm() != alg {
                    return Err(AttestationError::InvalidField("alg"));
                }
                PublicKey::from_credential_key(key)?.verify(alg, &data, sig)?;
                Ok(TrustPath::SelfAttestation)
            }
        }
    }
}

/// Packed attestation certificate requirements: version 3, a subject naming the vendor and the
/// `Authenticator Attestation` unit, and no CA basic constraint.
fn check_certificate(cert: &X509Certificate<'_>) -> Result<(), AttestationError> {
    let invalid = |reason: &str| Err(AttestationError::InvalidCertificate(reason.into()));

    if !x509::is_v3(cert) {
        return invalid("packed attestation certificate must be version 3");
    }

    let subject = cert.subject();
    let country = first_value(subject.iter_country());
    let organization = first_value(subject.iter_organization());
    let unit = first_value(subject.iter_organizational_unit());
    let common_name = first_value(subject.iter_common_name());

    if !country.is_some_and(|c| c.len() == 2 && c.bytes().all(|b| b.is_ascii_uppercase())) {
        return invalid("subject country must be an ISO 3166 code");
    }
    if organization.map_or(true, str::is_empty) {
        return invalid("subject organization is missing");
    }
    if unit != Some("Authenticator Attestation") {
        return invalid("subject organizational unit must be `Authenticator Attestation`");
    }
    if common_name.map_or(true, str::is_empty) {
        return invalid("subject common name is missing");
    }
    if cert.is_ca() {
        return invalid("packed attestation certificate must not be a CA");
    }
    Ok(())
}

fn first_value<'a, 'b: 'a>(
    mut attrs: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>,
) -> Option<&'a str> {
    attrs.next().and_then(|attr| attr.as_str().ok())
}
