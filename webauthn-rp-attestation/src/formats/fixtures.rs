//! Attestation objects captured from test authenticators, all bound to `client_data.json` and
//! certified by `root.der`.

use ciborium::value::Value;
use webauthn_rp_types::{
    authenticator::{AttestationObject, AttestationStatement},
    crypto::sha256,
};

use crate::clock::FixedClock;

pub(crate) const CLIENT_DATA: &[u8] = include_bytes!("../../testdata/client_data.json");
pub(crate) const ROOT: &[u8] = include_bytes!("../../testdata/root.der");

pub(crate) const PACKED: &[u8] = include_bytes!("../../testdata/packed.cbor");
pub(crate) const PACKED_AAGUID_MISMATCH: &[u8] =
    include_bytes!("../../testdata/packed_aaguid_mismatch.cbor");
pub(crate) const FIDO_U2F: &[u8] = include_bytes!("../../testdata/fido_u2f.cbor");
pub(crate) const ANDROID_KEY: &[u8] = include_bytes!("../../testdata/android_key.cbor");
pub(crate) const ANDROID_SAFETYNET: &[u8] =
    include_bytes!("../../testdata/android_safetynet.cbor");
pub(crate) const APPLE: &[u8] = include_bytes!("../../testdata/apple.cbor");
pub(crate) const TPM: &[u8] = include_bytes!("../../testdata/tpm.cbor");

/// 2026-01-01T00:00:00Z, ten seconds after the SafetyNet response was issued.
pub(crate) const NOW: u64 = 1_767_225_600;

pub(crate) fn clock() -> FixedClock {
    FixedClock::from_unix_seconds(NOW)
}

pub(crate) fn client_data_hash() -> [u8; 32] {
    sha256(CLIENT_DATA)
}

pub(crate) fn load(bytes: &[u8]) -> AttestationObject {
    AttestationObject::from_slice(bytes).expect("fixture decodes")
}

/// The statement with `name` removed.
pub(crate) fn without(statement: &AttestationStatement, name: &str) -> AttestationStatement {
    edit(statement, |fields| fields.retain(|(k, _)| k.as_text() != Some(name)))
}

/// The statement with `name` set to `value`.
pub(crate) fn with(
    statement: &AttestationStatement,
    name: &str,
    value: Value,
) -> AttestationStatement {
    edit(statement, |fields| {
        fields.retain(|(k, _)| k.as_text() != Some(name));
        fields.push((Value::Text(name.into()), value));
    })
}

/// The statement with the last byte of the byte string `name` flipped.
pub(crate) fn tampered(statement: &AttestationStatement, name: &str) -> AttestationStatement {
    let Some(Value::Bytes(bytes)) = statement.get(name) else {
        panic!("{name} is not a byte string");
    };
    let mut bytes = bytes.clone();
    if let Some(last) = bytes.last_mut() {
        *last ^= 0x01;
    }
    with(statement, name, Value::Bytes(bytes))
}

fn edit(
    statement: &AttestationStatement,
    f: impl FnOnce(&mut Vec<(Value, Value)>),
) -> AttestationStatement {
    let Value::Map(mut fields) = statement.to_cbor_value() else {
        unreachable!("statements are maps");
    };
    f(&mut fields);
    AttestationStatement::new(statement.format(), Value::Map(fields)).expect("valid statement")
}
