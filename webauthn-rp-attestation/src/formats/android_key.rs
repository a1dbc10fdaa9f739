use der_parser::{
    ber::BerObjectContent,
    der::{
        parse_der, parse_der_container, parse_der_enum, parse_der_integer,
        parse_der_octetstring, Header, Tag,
    },
    error::{BerError, BerResult},
};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    trust::TrustPath,
    webauthn::AttestationFormat,
};

use super::{
    algorithm, attested_credential, bytes, required_certificates, signed_data,
    AttestationStatementVerifier,
};
use crate::{
    x509::{self, oids},
    AttestationError,
};

const KM_ORIGIN_GENERATED: u32 = 0;
const KM_PURPOSE_SIGN: u32 = 2;

/// The `android-key` format, backed by the Android Keystore.
///
/// The credential key itself is certified: the leaf certificate holds the credential public key
/// and a KeyDescription extension binding the client data hash and the key's origin and purpose.
#[derive(Debug, Default, Clone, Copy)]
pub struct AndroidKeyAttestation;

impl AttestationStatementVerifier for AndroidKeyAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AndroidKey
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let alg = algorithm(statement)?;
        let sig = bytes(statement, "sig")?;
        let x5c = required_certificates(statement)?;
        let credential = attested_credential(auth_data)?;

        let leaf = x509::parse(&x5c[0])?;
        let leaf_key = x509::public_key(&leaf)?;
        leaf_key.verify(alg, &signed_data(auth_data, client_data_hash), sig)?;
        if !leaf_key.matches(credential.credential_public_key()) {
            return Err(AttestationError::CredentialKeyMismatch);
        }

        let invalid = || AttestationError::InvalidCertificateExtension("android key description");
        let extension = leaf
            .extensions()
            .iter()
            .find(|ext| ext.oid == oids::ANDROID_KEY_DESCRIPTION)
            .ok_or_else(invalid)?;
        let (_, description) = KeyDescription::parse(extension.value).map_err(|e| {
            log::debug!("malformed android key description: {e}");
            invalid()
        })?;

        if description.attestation_challenge != client_data_hash {
            return Err(invalid());
        }
        description.check().map_err(|reason| {
            log::debug!("android key description rejected: {reason}");
            invalid()
        })?;

        Ok(TrustPath::Certificate(x5c))
    }
}

/// The subset of the keymaster `AuthorizationList` relevant to attestation.
#[derive(Debug, Default, PartialEq, Eq)]
struct AuthorizationList {
    all_applications: bool,
    origin: Option<u32>,
    purpose: Vec<u32>,
}

impl AuthorizationList {
    fn parse(i: &[u8]) -> BerResult<'_, Self> {
        parse_der_container(|i: &[u8], hdr: Header| {
            if hdr.tag() != Tag::Sequence {
                return Err(nom::Err::Error(BerError::BerTypeError));
            }

            let mut list = AuthorizationList::default();
            let mut i = i;
            while !i.is_empty() {
                let (rest, obj) = parse_der(i)?;
                i = rest;
                match (obj.tag(), obj.content) {
                    (Tag(600), _) => list.all_applications = true,
                    (Tag(702), BerObjectContent::Unknown(any)) => {
                        let (_, origin) = parse_der_integer(any.data)?;
                        list.origin = Some(origin.as_u32()?);
                    }
                    (Tag(1), BerObjectContent::Unknown(any)) => {
                        let (_, set) = parse_der(any.data)?;
                        let BerObjectContent::Set(items) = set.content else {
                            return Err(nom::Err::Error(BerError::BerTypeError));
                        };
                        for item in items {
                            list.purpose.push(item.as_u32()?);
                        }
                    }
                    _ => continue,
                }
            }
            Ok((i, list))
        })(i)
    }

    fn is_generated_signing_key(&self) -> bool {
        self.origin == Some(KM_ORIGIN_GENERATED) && self.purpose.contains(&KM_PURPOSE_SIGN)
    }
}

/// The Android key attestation extension, `1.3.6.1.4.1.11129.2.1.17`.
#[derive(Debug)]
struct KeyDescription {
    attestation_challenge: Vec<u8>,
    software_enforced: AuthorizationList,
    tee_enforced: AuthorizationList,
}

impl KeyDescription {
    fn parse(i: &[u8]) -> BerResult<'_, Self> {
        parse_der_container(|i: &[u8], hdr: Header| {
            if hdr.tag() != Tag::Sequence {
                return Err(nom::Err::Error(BerError::BerTypeError));
            }
            let (i, _attestation_version) = parse_der_integer(i)?;
            let (i, _attestation_security_level) = parse_der_enum(i)?;
            let (i, _keymaster_version) = parse_der_integer(i)?;
            let (i, _keymaster_security_level) = parse_der_enum(i)?;
            let (i, challenge) = parse_der_octetstring(i)?;
            let (i, _unique_id) = parse_der_octetstring(i)?;
            let (i, software_enforced) = AuthorizationList::parse(i)?;
            let (i, tee_enforced) = AuthorizationList::parse(i)?;

            Ok((
                i,
                KeyDescription {
                    attestation_challenge: challenge.as_slice()?.to_vec(),
                    software_enforced,
                    tee_enforced,
                },
            ))
        })(i)
    }

    /// The key must be scoped to the RP, not to all applications, and must have been generated
    /// inside the keystore for signing.
    fn check(&self) -> Result<(), &'static str> {
        if self.software_enforced.all_applications || self.tee_enforced.all_applications {
            return Err("key is bound to all applications");
        }
        if !self.tee_enforced.is_generated_signing_key()
            && !self.software_enforced.is_generated_signing_key()
        {
            return Err("key was not generated in the keystore for signing");
        }
        Ok(())
    }
}
