//! Types specific to public key credential assertion
use serde::{Deserialize, Serialize};

use crate::{
    utils::serde::ignore_unknown,
    webauthn::{
        AuthenticationExtensionsClientInputs, PublicKeyCredential, PublicKeyCredentialDescriptor,
        UserVerificationRequirement,
    },
    Bytes,
};

/// The response to the successful authentication of a [`PublicKeyCredential`]
pub type AuthenticatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAssertionResponse>;

/// Options the relying party generated when it started an authentication ceremony. Like the
/// creation options they are kept server side and are single use.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialrequestoptions>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// The challenge the authenticator signs over, through the client data.
    pub challenge: Bytes,

    /// Ceremony timeout hint in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// The RP ID. When omitted the effective domain of the request is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,

    /// Credentials acceptable for this ceremony, empty to allow any discoverable credential.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,

    /// User verification requirement for the ceremony
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub user_verification: UserVerificationRequirement,

    /// Extension inputs sent to the client.
    #[serde(default)]
    pub extensions: AuthenticationExtensionsClientInputs,
}

/// The authenticator's response to an assertion request.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorassertionresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    /// Exact JSON bytes of the client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// Exact authenticator data bytes, signed together with the client data hash.
    pub authenticator_data: Bytes,

    /// Assertion signature over `authenticatorData || SHA-256(clientDataJSON)`.
    pub signature: Bytes,

    /// The user handle of the credential, required for discoverable credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Bytes>,
}
