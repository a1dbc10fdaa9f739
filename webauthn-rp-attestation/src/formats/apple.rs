use der_parser::{
    der::{
        parse_der_container, parse_der_octetstring, parse_der_tagged_explicit, Class, Header, Tag,
    },
    error::{BerError, BerResult},
};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    crypto::sha256_concat,
    trust::TrustPath,
    webauthn::AttestationFormat,
};

use super::{attested_credential, required_certificates, AttestationStatementVerifier};
use crate::{
    x509::{self, oids},
    AttestationError,
};

/// Apple anonymous attestation, the `apple` format.
///
/// There is no signature in the statement. Instead Apple's CA issues a certificate for the
/// credential key that carries `SHA-256(authenticatorData || clientDataHash)` as a nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleAttestation;

impl AttestationStatementVerifier for AppleAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Apple
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let x5c = required_certificates(statement)?;
        let credential = attested_credential(auth_data)?;

        let leaf = x509::parse(&x5c[0])?;
        let invalid = || AttestationError::InvalidCertificateExtension("apple nonce");
        let extension = leaf
            .extensions()
            .iter()
            .find(|ext| ext.oid == oids::APPLE_NONCE)
            .ok_or_else(invalid)?;
        let (_, nonce) = parse_nonce(extension.value).map_err(|_| invalid())?;

        if nonce != sha256_concat(&[auth_data.raw(), client_data_hash.as_slice()]) {
            return Err(invalid());
        }
        if !x509::public_key(&leaf)?.matches(credential.credential_public_key()) {
            return Err(AttestationError::CredentialKeyMismatch);
        }

        Ok(TrustPath::Certificate(x5c))
    }
}

/// `SEQUENCE { [1] EXPLICIT OCTET STRING }`
fn parse_nonce(i: &[u8]) -> BerResult<'_, [u8; 32]> {
    parse_der_container(|i: &[u8], hdr: Header| {
        if hdr.tag() != Tag::Sequence {
            return Err(nom::Err::Error(BerError::BerTypeError));
        }
        let (i, tagged) = parse_der_tagged_explicit(1, parse_der_octetstring)(i)?;
        let (class, _tag, nonce) = tagged.as_tagged()?;
        if class != Class::ContextSpecific {
            return Err(nom::Err::Error(BerError::BerTypeError));
        }
        let nonce = nonce
            .as_slice()?
            .try_into()
            .map_err(|_| BerError::InvalidLength)?;
        Ok((i, nonce))
    })(i)
}

#[cfg(test)]
mod tests {
    use ciborium::value::Value;
    use webauthn_rp_types::authenticator::CredentialPublicKey;

    use super::*;
    use crate::formats::fixtures::{self, client_data_hash, load, without};

    #[test]
    fn verifies_apple_attestation() {
        let object = load(fixtures::APPLE);
        let path = AppleAttestation
            .verify(&object.statement, &object.auth_data, &client_data_hash())
            .expect("valid attestation");
        assert_eq!(path.kind(), "certificate");
    }

    #[test]
    fn nonce_binds_the_client_data() {
        let object = load(fixtures::APPLE);
        assert_eq!(
            AppleAttestation.verify(&object.statement, &object.auth_data, &[0; 32]),
            Err(AttestationError::InvalidCertificateExtension("apple nonce"))
        );
    }

    #[test]
    fn missing_certificates() {
        let object = load(fixtures::APPLE);
        let statement = without(&object.statement, "x5c");
        assert_eq!(
            AppleAttestation.verify(&statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::MissingField("x5c"))
        );
    }

    #[test]
    fn certificate_for_another_key() {
        let object = load(fixtures::APPLE);
        let Some(Value::Array(x5c)) = object.statement.get("x5c") else {
            panic!("x5c is an array");
        };
        let Some(Value::Bytes(der)) = x5c.first() else {
            panic!("x5c holds certificates");
        };
        let leaf_key = x509::public_key(&x509::parse(der).unwrap()).unwrap();
        let credential = object.auth_data.attested_credential_data().unwrap();
        assert!(leaf_key.matches(credential.credential_public_key()));

        let signing_key = p256::ecdsa::SigningKey::from_slice(&[0x44; 32]).unwrap();
        let point = signing_key.verifying_key().to_encoded_point(false);
        let other = CredentialPublicKey::Ec2 {
            alg: coset::iana::Algorithm::ES256,
            crv: coset::iana::EllipticCurve::P_256,
            x: point.x().unwrap().to_vec(),
            y: point.y().unwrap().to_vec(),
        };
        assert!(!leaf_key.matches(&other));
    }
}
