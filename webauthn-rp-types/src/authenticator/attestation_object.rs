use ciborium::value::Value;

use super::{AuthenticatorData, DecodeError};
use crate::utils::cbor;

/// The CBOR object returned by `navigator.credentials.create()`, carrying the authenticator data
/// and an attestation statement in the format named by `fmt`.
///
/// <https://w3c.github.io/webauthn/#sctn-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    /// Authenticator data, decoded from the `authData` byte string.
    pub auth_data: AuthenticatorData,

    /// The format tagged attestation statement.
    pub statement: AttestationStatement,
}

impl AttestationObject {
    /// Decode an attestation object.
    ///
    /// The map must hold exactly the text keys `fmt`, `attStmt` and `authData`, each once.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut input = bytes;
        let value: Value = ciborium::de::from_reader(&mut input)
            .map_err(|e| DecodeError::MalformedAttestationObject(e.to_string()))?;
        if !input.is_empty() {
            return Err(DecodeError::MalformedAttestationObject(
                "trailing bytes after the attestation object".into(),
            ));
        }

        let mut fmt = None;
        let mut att_stmt = None;
        let mut auth_data = None;
        for (key, val) in
            cbor::text_keyed_entries(value).map_err(DecodeError::MalformedAttestationObject)?
        {
            match (key.as_str(), val) {
                ("fmt", Value::Text(text)) => fmt = Some(text),
                ("attStmt", val @ Value::Map(_)) => att_stmt = Some(val),
                ("authData", Value::Bytes(bytes)) => auth_data = Some(bytes),
                (other, _) => {
                    return Err(DecodeError::MalformedAttestationObject(format!(
                        "unexpected or mistyped key `{other}`"
                    )))
                }
            }
        }

        let missing =
            |name: &str| DecodeError::MalformedAttestationObject(format!("missing `{name}`"));
        let format = fmt.ok_or_else(|| missing("fmt"))?;
        let att_stmt = att_stmt.ok_or_else(|| missing("attStmt"))?;
        let auth_data = auth_data.ok_or_else(|| missing("authData"))?;

        Ok(Self {
            auth_data: AuthenticatorData::from_slice(&auth_data)?,
            statement: AttestationStatement::new(format, att_stmt)?,
        })
    }

    /// Encode back into the `{fmt, attStmt, authData}` map.
    pub fn to_vec(&self) -> Vec<u8> {
        cbor::to_vec(&Value::Map(vec![
            (
                Value::Text("fmt".into()),
                Value::Text(self.statement.format().into()),
            ),
            (Value::Text("attStmt".into()), self.statement.to_cbor_value()),
            (
                Value::Text("authData".into()),
                Value::Bytes(self.auth_data.raw().to_vec()),
            ),
        ]))
    }
}

/// An attestation statement: its format identifier and the raw statement map.
///
/// The fields are kept as CBOR because their shape depends on the format. Each verifier looks up
/// what it needs through [`Self::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationStatement {
    format: String,
    fields: Vec<(String, Value)>,
}

impl AttestationStatement {
    /// Wrap a statement map, rejecting non text or duplicate keys.
    pub fn new(format: impl Into<String>, att_stmt: Value) -> Result<Self, DecodeError> {
        let fields =
            cbor::text_keyed_entries(att_stmt).map_err(DecodeError::MalformedAttestationObject)?;
        Ok(Self {
            format: format.into(),
            fields,
        })
    }

    /// The `fmt` identifier, e.g. `packed`.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Look up a statement field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Whether the statement map has no fields, as required for `none`.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the fields present, in the order they were encoded.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// The statement map as a CBOR value.
    pub fn to_cbor_value(&self) -> Value {
        Value::Map(
            self.fields
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use ciborium::cbor;

    use super::*;

    fn encode(value: &Value) -> Vec<u8> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(value, &mut bytes).expect("could not encode");
        bytes
    }

    fn auth_data() -> Vec<u8> {
        AuthenticatorData::new("example.com", 7).raw().to_vec()
    }

    #[test]
    fn decodes_none_attestation() {
        let object = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(auth_data()),
        })
        .unwrap();

        let decoded = AttestationObject::from_slice(&encode(&object)).expect("valid object");
        assert_eq!(decoded.statement.format(), "none");
        assert!(decoded.statement.is_empty());
        assert_eq!(decoded.auth_data.sign_count(), 7);
        assert_eq!(decoded.to_vec(), encode(&object));
    }

    #[test]
    fn statement_lookup() {
        let object = cbor!({
            "fmt" => "packed",
            "attStmt" => { "alg" => -7, "sig" => Value::Bytes(vec![1, 2]) },
            "authData" => Value::Bytes(auth_data()),
        })
        .unwrap();

        let decoded = AttestationObject::from_slice(&encode(&object)).expect("valid object");
        assert_eq!(
            decoded.statement.get("sig"),
            Some(&Value::Bytes(vec![1, 2]))
        );
        assert!(decoded.statement.get("x5c").is_none());
        assert_eq!(decoded.statement.keys().collect::<Vec<_>>(), ["alg", "sig"]);
    }

    #[test]
    fn unknown_duplicate_and_missing_keys_are_rejected() {
        let unknown = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(auth_data()),
            "epAtt" => true,
        })
        .unwrap();
        assert!(matches!(
            AttestationObject::from_slice(&encode(&unknown)),
            Err(DecodeError::MalformedAttestationObject(_))
        ));

        let duplicate = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("fmt".into()), Value::Text("packed".into())),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
            (Value::Text("authData".into()), Value::Bytes(auth_data())),
        ]);
        assert!(matches!(
            AttestationObject::from_slice(&encode(&duplicate)),
            Err(DecodeError::MalformedAttestationObject(_))
        ));

        let missing = cbor!({ "fmt" => "none", "attStmt" => {} }).unwrap();
        assert_eq!(
            AttestationObject::from_slice(&encode(&missing)),
            Err(DecodeError::MalformedAttestationObject(
                "missing `authData`".into()
            ))
        );
    }

    #[test]
    fn auth_data_errors_propagate() {
        let object = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(vec![0; 12]),
        })
        .unwrap();
        assert_eq!(
            AttestationObject::from_slice(&encode(&object)),
            Err(DecodeError::TruncatedInput)
        );
    }
}
