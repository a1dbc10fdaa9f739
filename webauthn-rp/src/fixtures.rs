//! Ceremony responses for the validator tests.
//!
//! Registrations either use the captured attestation objects of `webauthn-rp-attestation`, which
//! are bound to `client_data.json`, or a synthetic `none` attestation for a P-256 key. Assertions
//! are signed with the same key.

use coset::iana;
use p256::ecdsa::{signature::Signer, DerSignature, SigningKey};
use webauthn_rp_attestation::FixedClock;
use webauthn_rp_types::{
    authenticator::{
        Aaguid, AttestationObject, AttestationStatement, AttestedCredentialData,
        AuthenticatorData, CredentialPublicKey, Flags,
    },
    crypto::sha256,
    encoding::base64url,
    trust::TrustPath,
    webauthn::{
        AttestationConveyancePreference, AttestationFormat, AuthenticatedPublicKeyCredential,
        AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
        CreatedPublicKeyCredential, PublicKeyCredential, PublicKeyCredentialCreationOptions,
        PublicKeyCredentialParameters, PublicKeyCredentialRequestOptions,
        PublicKeyCredentialRpEntity, PublicKeyCredentialType, PublicKeyCredentialUserEntity,
        UserVerificationRequirement,
    },
    Bytes, PublicKeyCredentialSource,
};

pub(crate) const CLIENT_DATA: &[u8] =
    include_bytes!("../../webauthn-rp-attestation/testdata/client_data.json");
pub(crate) const ROOT: &[u8] = include_bytes!("../../webauthn-rp-attestation/testdata/root.der");
pub(crate) const PACKED: &[u8] =
    include_bytes!("../../webauthn-rp-attestation/testdata/packed.cbor");
pub(crate) const FIDO_U2F: &[u8] =
    include_bytes!("../../webauthn-rp-attestation/testdata/fido_u2f.cbor");

pub(crate) const RP_ID: &str = "example.com";
pub(crate) const ORIGIN: &str = "https://example.com";
pub(crate) const USER_HANDLE: &[u8] = b"user-1234";
pub(crate) const CREDENTIAL_ID: [u8; 16] = [0x5a; 16];

/// The validity window of every fixture certificate contains 2026-01-01T00:00:00Z.
pub(crate) fn clock() -> FixedClock {
    FixedClock::from_unix_seconds(1_767_225_600)
}

/// The challenge `client_data.json` was produced for.
pub(crate) fn challenge() -> Bytes {
    (0..32).collect()
}

pub(crate) fn client_data(ty: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    format!(
        r#"{{"type":"{ty}","challenge":"{}","origin":"{origin}","crossOrigin":false}}"#,
        base64url(challenge)
    )
    .into_bytes()
}

pub(crate) fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x42; 32]).expect("valid scalar")
}

pub(crate) fn credential_key() -> CredentialPublicKey {
    let point = signing_key().verifying_key().to_encoded_point(false);
    CredentialPublicKey::Ec2 {
        alg: iana::Algorithm::ES256,
        crv: iana::EllipticCurve::P_256,
        x: point.x().expect("uncompressed point").to_vec(),
        y: point.y().expect("uncompressed point").to_vec(),
    }
}

pub(crate) fn creation_options(challenge: Bytes) -> PublicKeyCredentialCreationOptions {
    PublicKeyCredentialCreationOptions {
        rp: PublicKeyCredentialRpEntity {
            id: Some(RP_ID.into()),
            name: "Example".into(),
        },
        user: PublicKeyCredentialUserEntity {
            id: USER_HANDLE.into(),
            display_name: "Jane Doe".into(),
            name: "jane@example.com".into(),
        },
        challenge,
        pub_key_cred_params: PublicKeyCredentialParameters::default_algorithms(),
        timeout: None,
        exclude_credentials: Vec::new(),
        authenticator_selection: None,
        attestation: AttestationConveyancePreference::Direct,
        extensions: Default::default(),
    }
}

pub(crate) fn request_options(challenge: Bytes) -> PublicKeyCredentialRequestOptions {
    PublicKeyCredentialRequestOptions {
        challenge,
        timeout: None,
        rp_id: Some(RP_ID.into()),
        allow_credentials: Vec::new(),
        user_verification: UserVerificationRequirement::Preferred,
        extensions: Default::default(),
    }
}

pub(crate) fn created(
    credential_id: &[u8],
    client_data_json: Vec<u8>,
    attestation_object: Vec<u8>,
) -> CreatedPublicKeyCredential {
    PublicKeyCredential {
        id: base64url(credential_id),
        raw_id: credential_id.into(),
        ty: PublicKeyCredentialType::PublicKey,
        response: AuthenticatorAttestationResponse {
            client_data_json: client_data_json.into(),
            attestation_object: attestation_object.into(),
            transports: Vec::new(),
        },
        authenticator_attachment: None,
        client_extension_results: Default::default(),
    }
}

/// Authenticator data carrying the P-256 credential, as a platform authenticator without
/// attestation would produce it.
pub(crate) fn attested_auth_data(rp_id: &str, flags: Flags) -> AuthenticatorData {
    let credential =
        AttestedCredentialData::new(Aaguid::new_empty(), CREDENTIAL_ID.to_vec(), credential_key())
            .expect("short credential ID");
    AuthenticatorData::new(rp_id, 0)
        .set_attested_credential_data(credential)
        .set_flags(flags)
}

pub(crate) fn none_attestation_object(auth_data: AuthenticatorData) -> Vec<u8> {
    AttestationObject {
        auth_data,
        statement: AttestationStatement::new("none", ciborium::value::Value::Map(Vec::new()))
            .expect("empty statement"),
    }
    .to_vec()
}

/// A `none` registration of the P-256 credential answering `creation_options(challenge())`.
pub(crate) fn none_registration() -> CreatedPublicKeyCredential {
    created(
        &CREDENTIAL_ID,
        client_data("webauthn.create", &challenge(), ORIGIN),
        none_attestation_object(attested_auth_data(RP_ID, Flags::UP | Flags::UV)),
    )
}

/// The stored source of the P-256 credential.
pub(crate) fn stored_source(sign_count: u32) -> PublicKeyCredentialSource {
    PublicKeyCredentialSource {
        credential_id: CREDENTIAL_ID.as_slice().into(),
        ty: PublicKeyCredentialType::PublicKey,
        transports: Vec::new(),
        attestation_format: AttestationFormat::None,
        trust_path: TrustPath::None,
        aaguid: Aaguid::new_empty(),
        credential_public_key: credential_key().to_vec().into(),
        user_handle: USER_HANDLE.into(),
        sign_count,
        backup_eligible: false,
        backup_state: false,
        uv_initialized: true,
    }
}

/// An assertion for the P-256 credential, signed over `auth_data` and `client_data_json`.
pub(crate) fn assertion(
    auth_data: &AuthenticatorData,
    client_data_json: Vec<u8>,
    user_handle: Option<&[u8]>,
) -> AuthenticatedPublicKeyCredential {
    let signed = [auth_data.raw(), &sha256(&client_data_json)[..]].concat();
    let signature: DerSignature = signing_key().sign(&signed);
    PublicKeyCredential {
        id: base64url(&CREDENTIAL_ID),
        raw_id: CREDENTIAL_ID.as_slice().into(),
        ty: PublicKeyCredentialType::PublicKey,
        response: AuthenticatorAssertionResponse {
            client_data_json: client_data_json.into(),
            authenticator_data: auth_data.to_vec().into(),
            signature: signature.as_bytes().into(),
            user_handle: user_handle.map(Into::into),
        },
        authenticator_attachment: None,
        client_extension_results: Default::default(),
    }
}

/// A `webauthn.get` assertion with counter `sign_count` and the user verified.
pub(crate) fn signed_assertion(sign_count: u32) -> AuthenticatedPublicKeyCredential {
    let auth_data = AuthenticatorData::new(RP_ID, sign_count).set_flags(Flags::UP | Flags::UV);
    assertion(
        &auth_data,
        client_data("webauthn.get", &challenge(), ORIGIN),
        Some(USER_HANDLE),
    )
}
