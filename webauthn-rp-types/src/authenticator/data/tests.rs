use ciborium::{cbor, value::Value};
use coset::iana;
use rand::RngCore;

use super::*;

fn random_vec(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

/// Authenticator data produced by a YubiKey 5 with the credProtect extension.
const YUBIKEY_AT_ED: [u8; 194] = [
    0x74, 0xa6, 0xea, 0x92, 0x13, 0xc9, 0x9c, 0x2f, 0x74, 0xb2, 0x24, 0x92, 0xb3, 0x20, 0xcf, 0x40,
    0x26, 0x2a, 0x94, 0xc1, 0xa9, 0x50, 0xa0, 0x39, 0x7f, 0x29, 0x25, 0x0b, 0x60, 0x84, 0x1e, 0xf0,
    0xc5, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x0c, 0x98, 0x51, 0xdc, 0x8b, 0xd1, 0xef, 0x2d, 0x08,
    0x4b, 0x20, 0x1c, 0xbf, 0x5e, 0x4c, 0x14, 0x04, 0x4f, 0xf8, 0x87, 0x04, 0x11, 0x5e, 0x6c, 0x58,
    0x94, 0xb8, 0x69, 0xbb, 0x45, 0x3c, 0x3f, 0xe2, 0x1e, 0xb1, 0x22, 0x44, 0xc6, 0xe7, 0xe9, 0x6a,
    0xbe, 0xd3, 0x0f, 0x18, 0x1b, 0x9f, 0x86, 0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01, 0x21, 0x58,
    0x20, 0x0c, 0x98, 0x51, 0xdc, 0x8b, 0xd1, 0xef, 0x2d, 0x08, 0x4b, 0x20, 0x1c, 0xbf, 0xad, 0xd9,
    0xa6, 0x97, 0xbb, 0x48, 0xd9, 0xd7, 0xff, 0x91, 0x0f, 0x0a, 0x6a, 0xc1, 0x0b, 0x91, 0x2b, 0xe9,
    0x58, 0x22, 0x58, 0x20, 0x46, 0x78, 0x6f, 0x2a, 0x95, 0x76, 0x69, 0x8c, 0x9f, 0x3a, 0xe2, 0x52,
    0x3b, 0x4e, 0xb9, 0x4b, 0x8e, 0x07, 0x4c, 0x35, 0xab, 0xc4, 0xdf, 0x68, 0x8f, 0xcd, 0x85, 0xd2,
    0x9a, 0x01, 0xab, 0xba, 0xa1, 0x6b, 0x63, 0x72, 0x65, 0x64, 0x50, 0x72, 0x6f, 0x74, 0x65, 0x63,
    0x74, 0x02,
];

#[test]
fn decodes_authenticator_data_with_at_and_ed() {
    let auth_data =
        AuthenticatorData::from_slice(&YUBIKEY_AT_ED).expect("could not parse the authenticator data");

    assert_eq!(auth_data.flags(), Flags::UP | Flags::UV | Flags::AT | Flags::ED);
    assert_eq!(auth_data.sign_count(), 1);
    assert_eq!(auth_data.raw(), YUBIKEY_AT_ED.as_slice());

    let acd = auth_data
        .attested_credential_data()
        .expect("attested credential data should be present");
    // interestingly a yubikey returns an empty AAGUID
    assert!(acd.aaguid.is_empty());
    assert_eq!(acd.credential_id().len(), 48);
    assert_eq!(acd.credential_public_key().algorithm(), iana::Algorithm::ES256);
    assert_eq!(acd.public_key_bytes().len(), 77);

    assert_eq!(
        auth_data.extensions(),
        Some(&cbor!({ "credProtect" => 2 }).unwrap())
    );
}

#[test]
fn decodes_assertion_authenticator_data() {
    let data = [
        0x74, 0xa6, 0xea, 0x92, 0x13, 0xc9, 0x9c, 0x2f, 0x74, 0xb2, 0x24, 0x92, 0xb3, 0x20, 0xcf,
        0x40, 0x26, 0x2a, 0x94, 0xc1, 0xa9, 0x50, 0xa0, 0x39, 0x7f, 0x29, 0x25, 0x0b, 0x60, 0x84,
        0x1e, 0xf0, 0x01, 0x00, 0x00, 0x01, 0x02,
    ];
    let auth_data = AuthenticatorData::from_slice(&data).expect("37 bytes is enough");
    assert_eq!(auth_data.flags(), Flags::UP);
    assert_eq!(auth_data.sign_count(), 258);
    assert!(auth_data.attested_credential_data().is_none());
    assert!(auth_data.extensions().is_none());
}

#[test]
fn short_input_is_truncated() {
    assert_eq!(
        AuthenticatorData::from_slice(&YUBIKEY_AT_ED[..36]),
        Err(DecodeError::TruncatedInput)
    );
    // AT set but the credential ID length runs past the end
    assert_eq!(
        AuthenticatorData::from_slice(&YUBIKEY_AT_ED[..60]),
        Err(DecodeError::TruncatedInput)
    );
}

#[test]
fn truncation_is_reported_where_it_happens() {
    // AAGUID, credential ID length and credential ID end at 53, 55 and 103
    for len in 0..103 {
        assert_eq!(
            AuthenticatorData::from_slice(&YUBIKEY_AT_ED[..len]),
            Err(DecodeError::TruncatedInput),
            "cut at {len}"
        );
    }
    // a cut inside the credential key is a broken key, not a short header
    for len in 103..180 {
        assert_eq!(
            AuthenticatorData::from_slice(&YUBIKEY_AT_ED[..len]),
            Err(DecodeError::InvalidCredentialPublicKey(CoseKeyError::Cbor)),
            "cut at {len}"
        );
    }
    assert_eq!(
        AuthenticatorData::from_slice(&YUBIKEY_AT_ED[..180]),
        Err(DecodeError::InvalidExtensions)
    );
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut data = YUBIKEY_AT_ED.to_vec();
    data.extend_from_slice(&[0xde, 0xad]);
    assert_eq!(
        AuthenticatorData::from_slice(&data),
        Err(DecodeError::TrailingData { len: 2 })
    );

    // Dropping the ED flag leaves the extension map as garbage after the key
    let mut data = YUBIKEY_AT_ED.to_vec();
    data[32] = 0x45;
    assert_eq!(
        AuthenticatorData::from_slice(&data),
        Err(DecodeError::TrailingData { len: 14 })
    );
}

#[test]
fn broken_credential_key_fails_the_whole_decode() {
    let mut data = YUBIKEY_AT_ED[..103].to_vec();
    // map(1) { 1: 2 } is not a usable key
    data.extend_from_slice(&[0xa1, 0x01, 0x02]);
    data[32] = 0x45;
    assert!(matches!(
        AuthenticatorData::from_slice(&data),
        Err(DecodeError::InvalidCredentialPublicKey(
            CoseKeyError::MissingLabel(3)
        ))
    ));
}

#[test]
fn non_map_extensions_are_rejected() {
    let mut data = YUBIKEY_AT_ED[..37].to_vec();
    data[32] = 0x81;
    data.push(0x02);
    assert_eq!(
        AuthenticatorData::from_slice(&data),
        Err(DecodeError::InvalidExtensions)
    );
}

#[test]
fn reserved_flag_bits_are_kept() {
    let mut data = YUBIKEY_AT_ED[..37].to_vec();
    data[32] = 0x23;
    let auth_data = AuthenticatorData::from_slice(&data).expect("reserved bits are not an error");
    assert_eq!(u8::from(auth_data.flags()), 0x23);
}

fn round_trip(key: CredentialPublicKey) {
    let credential_id = random_vec(16);
    let expected = AuthenticatorData::new("future.example.com", 42)
        .set_flags(Flags::UP | Flags::UV | Flags::BE)
        .set_attested_credential_data(
            AttestedCredentialData::new(Aaguid([0x5a; 16]), credential_id.clone(), key.clone())
                .expect("short credential id"),
        )
        .set_extensions(cbor!({ "credProtect" => 1 }).unwrap());

    let decoded = AuthenticatorData::from_slice(&expected.to_vec()).expect("could not decode");

    assert_eq!(decoded, expected);
    assert_eq!(decoded.flags(), Flags::UP | Flags::UV | Flags::BE | Flags::AT | Flags::ED);
    assert_eq!(decoded.sign_count(), 42);
    assert_eq!(decoded.rp_id_hash(), &sha256(b"future.example.com"));
    let acd = decoded.attested_credential_data().expect("AT is set");
    assert_eq!(acd.aaguid, Aaguid([0x5a; 16]));
    assert_eq!(acd.credential_id(), credential_id.as_slice());
    assert_eq!(acd.credential_public_key(), &key);
}

#[test]
fn round_trip_every_key_type() {
    round_trip(CredentialPublicKey::Ec2 {
        alg: iana::Algorithm::ES256,
        crv: iana::EllipticCurve::P_256,
        // random coordinates are not a valid point, which the decoder does not care about
        x: random_vec(32),
        y: random_vec(32),
    });
    round_trip(CredentialPublicKey::Ec2 {
        alg: iana::Algorithm::ES384,
        crv: iana::EllipticCurve::P_384,
        x: random_vec(48),
        y: random_vec(48),
    });
    round_trip(CredentialPublicKey::Rsa {
        alg: iana::Algorithm::PS256,
        n: random_vec(256),
        e: vec![0x01, 0x00, 0x01],
    });
    round_trip(CredentialPublicKey::Okp {
        alg: iana::Algorithm::EdDSA,
        crv: iana::EllipticCurve::Ed25519,
        x: random_vec(32),
    });
}

#[test]
fn extensions_must_have_text_keys() {
    let data = AuthenticatorData::new("example.com", 0)
        .set_extensions(Value::Map(vec![(Value::Integer(1.into()), Value::Bool(true))]));
    assert_eq!(
        AuthenticatorData::from_slice(data.raw()),
        Err(DecodeError::InvalidExtensions)
    );
}
