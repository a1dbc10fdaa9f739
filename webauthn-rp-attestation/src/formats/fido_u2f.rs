use coset::iana::{self, EnumI64};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData, CredentialPublicKey},
    trust::TrustPath,
    webauthn::AttestationFormat,
};

use super::{attested_credential, bytes, required_certificates, AttestationStatementVerifier};
use crate::{crypto::PublicKey, x509, AttestationError};

/// The `fido-u2f` format, produced by U2F authenticators through CTAP1.
///
/// The attestation signs `0x00 || rpIdHash || clientDataHash || credentialId || publicKey`
/// where the public key is the uncompressed P-256 point.
#[derive(Debug, Default, Clone, Copy)]
pub struct FidoU2fAttestation;

impl AttestationStatementVerifier for FidoU2fAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::FidoU2f
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let sig = bytes(statement, "sig")?;
        let x5c = required_certificates(statement)?;
        if x5c.len() != 1 {
            return Err(AttestationError::InvalidField("x5c"));
        }
        let credential = attested_credential(auth_data)?;

        let point = match credential.credential_public_key() {
            key @ CredentialPublicKey::Ec2 {
                crv: iana::EllipticCurve::P_256,
                ..
            } => key.ec_point().ok_or(AttestationError::CredentialKeyMismatch)?,
            key => {
                return Err(AttestationError::UnsupportedAlgorithm(
                    key.algorithm().to_i64(),
                ))
            }
        };

        let cert = x509::parse(&x5c[0])?;
        let cert_key = x509::public_key(&cert)?;
        if !matches!(cert_key, PublicKey::P256(_)) {
            return Err(AttestationError::InvalidCertificate(
                "U2F attestation key is not on P-256".into(),
            ));
        }

        let verification_data: Vec<u8> = std::iter::once(0x00)
            .chain(auth_data.rp_id_hash().iter().copied())
            .chain(client_data_hash.iter().copied())
            .chain(credential.credential_id().iter().copied())
            .chain(point)
            .collect();
        cert_key.verify(iana::Algorithm::ES256, &verification_data, sig)?;

        Ok(TrustPath::Certificate(x5c))
    }
}
