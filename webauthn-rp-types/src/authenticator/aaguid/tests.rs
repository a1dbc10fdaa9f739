use super::Aaguid;

#[test]
fn deserialize_byte_str_to_aaguid() {
    let cbor_bytes = [
        0x50, // bytes(16)
        0x08, 0x98, 0x70, 0x58, 0xca, 0xdc, 0x4b, 0x81, // data
        0xb6, 0xe1, 0x30, 0xde, 0x50, 0xdc, 0xbe, 0x47,
    ];

    let aaguid: Aaguid = ciborium::de::from_reader(cbor_bytes.as_slice())
        .expect("could not deserialize from byte string");
    assert_eq!(aaguid.to_string(), "08987058-cadc-4b81-b6e1-30de50dcbe47");
}

#[test]
fn short_byte_str_is_rejected() {
    let cbor_bytes = [0x43, 0x01, 0x02, 0x03];
    ciborium::de::from_reader::<Aaguid, _>(cbor_bytes.as_slice())
        .expect_err("a 3 byte AAGUID should not deserialize");
}

#[test]
fn json_round_trip_uses_number_arrays() {
    let aaguid = Aaguid([7; 16]);
    let json = serde_json::to_string(&aaguid).expect("could not serialize aaguid");
    let back: Aaguid = serde_json::from_str(&json).expect("could not deserialize aaguid");
    assert_eq!(aaguid, back);
}

#[test]
fn empty_detection() {
    assert!(Aaguid::new_empty().is_empty());
    assert!(!Aaguid([1; 16]).is_empty());
}
