use ciborium::value::Value;

/// Encode a CBOR value into a fresh buffer.
///
/// Serializing a [`Value`] into a `Vec` has no failure path, the error branch only exists because
/// the writer is generic over I/O.
pub(crate) fn to_vec(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    if ciborium::ser::into_writer(value, &mut buf).is_err() {
        buf.clear();
    }
    buf
}

/// Text keyed view over a CBOR map, rejecting anything but unique text keys.
pub(crate) fn text_keyed_entries(value: Value) -> Result<Vec<(String, Value)>, String> {
    let Value::Map(entries) = value else {
        return Err("expected a CBOR map".into());
    };
    let mut out: Vec<(String, Value)> = Vec::with_capacity(entries.len());
    for (key, val) in entries {
        let Value::Text(key) = key else {
            return Err("map keys must be text strings".into());
        };
        if out.iter().any(|(seen, _)| *seen == key) {
            return Err(format!("duplicate map key `{key}`"));
        }
        out.push((key, val));
    }
    Ok(out)
}
