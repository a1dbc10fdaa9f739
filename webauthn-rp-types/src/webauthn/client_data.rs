use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::utils::serde::ignore_unknown;

/// The client data is the contextual binding made by the client: the ceremony type, the challenge
/// it answered and the origin of the calling page. The relying party receives it as exact JSON
/// bytes and parses it with [`CollectedClientData::from_json`].
///
/// <https://w3c.github.io/webauthn/#dictdef-collectedclientdata>
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    /// Which ceremony produced this client data. Values this library does not know parse as
    /// [`ClientDataType::Unknown`] so the ceremony can fail with a type mismatch.
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: ClientDataType,

    /// The base64url encoding of the challenge provided by the relying party.
    pub challenge: String,

    /// The fully qualified origin of the requester, see [RFC6454].
    ///
    /// [RFC6454]: https://www.rfc-editor.org/rfc/rfc6454
    pub origin: String,

    /// Whether the calling context is cross-origin.
    #[serde(default, serialize_with = "truthiness")]
    pub cross_origin: Option<bool>,

    /// Token binding state of the TLS connection between client and relying party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_binding: Option<TokenBinding>,

    /// Keys unknown to this library, kept in order.
    #[serde(flatten)]
    pub unknown_keys: IndexMap<String, serde_json::Value>,
}

fn truthiness<S>(cross_origin: &Option<bool>, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ser.serialize_bool(cross_origin.filter(|b| *b).is_some())
}

impl CollectedClientData {
    /// Parse the exact `clientDataJSON` bytes sent by the client.
    pub fn from_json(client_data_json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(client_data_json)
    }

    /// The challenge bytes, `None` when [`Self::challenge`] is not valid base64url.
    pub fn challenge_bytes(&self) -> Option<Vec<u8>> {
        crate::encoding::try_from_base64url(&self.challenge)
    }
}

/// Values of [`CollectedClientData::ty`].
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    /// `"webauthn.create"`, a registration ceremony
    #[serde(rename = "webauthn.create")]
    Create,

    /// `"webauthn.get"`, an authentication ceremony
    #[serde(rename = "webauthn.get")]
    Get,

    /// `"payment.get"` from Secure Payment Confirmation. Neither ceremony here accepts it.
    #[serde(rename = "payment.get")]
    PaymentGet,

    /// Anything else
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Token binding information carried in the client data.
///
/// <https://w3c.github.io/webauthn/#dictdef-tokenbinding>
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenBinding {
    /// Whether the client negotiated token binding.
    pub status: TokenBindingStatus,

    /// Base64url encoding of the token binding ID, required when `status` is `present`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// <https://w3c.github.io/webauthn/#enumdef-tokenbindingstatus>
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenBindingStatus {
    /// Token binding was used when talking to the relying party, `id` must be present.
    Present,
    /// The client supports token binding but it was not negotiated.
    Supported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_data_with_unknown_keys() {
        let json = br#"{"type":"webauthn.create","challenge":"AAEC","origin":"https://example.com","crossOrigin":false,"other_keys_can_be_added_here":"do not compare clientDataJSON against a template"}"#;
        let data = CollectedClientData::from_json(json).expect("valid client data");
        assert_eq!(data.ty, ClientDataType::Create);
        assert_eq!(data.challenge_bytes(), Some(vec![0, 1, 2]));
        assert_eq!(data.origin, "https://example.com");
        assert_eq!(data.cross_origin, Some(false));
        assert!(data.token_binding.is_none());
        assert_eq!(data.unknown_keys.len(), 1);
    }

    #[test]
    fn unknown_type_is_kept_as_unknown() {
        let json = br#"{"type":"webauthn.frobnicate","challenge":"AAEC","origin":"https://example.com"}"#;
        let data = CollectedClientData::from_json(json).expect("type values are not validated here");
        assert_eq!(data.ty, ClientDataType::Unknown);
    }

    #[test]
    fn token_binding_present() {
        let json = br#"{"type":"webauthn.get","challenge":"AAEC","origin":"https://example.com","tokenBinding":{"status":"present","id":"dGJpZA"}}"#;
        let data = CollectedClientData::from_json(json).expect("valid client data");
        assert_eq!(
            data.token_binding,
            Some(TokenBinding {
                status: TokenBindingStatus::Present,
                id: Some("dGJpZA".into())
            })
        );
    }

    #[test]
    fn rejects_non_json() {
        CollectedClientData::from_json(b"\xa1\x00")
            .expect_err("CBOR is not client data");
    }
}
