//! Extension inputs a relying party requests and the client extension outputs it receives back.
//!
//! Only extensions with an authenticator output the relying party can check are modelled. The
//! authenticator outputs themselves travel inside the authenticator data as CBOR.

use serde::{Deserialize, Serialize};

use crate::{utils::serde::ignore_unknown, Bytes};

/// Extension inputs of a creation or request options object.
///
/// <https://w3c.github.io/webauthn/#dictdef-authenticationextensionsclientinputs>
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExtensionsClientInputs {
    /// CTAP2 `credProtect`, registration only.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub credential_protection_policy: Option<CredentialProtectionPolicy>,

    /// Fail the registration rather than create a credential with a weaker protection policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_credential_protection_policy: Option<bool>,

    /// CTAP2 `hmac-secret` on registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_create_secret: Option<bool>,

    /// CTAP2 `hmac-secret` on authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_get_secret: Option<HmacGetSecretInput>,

    /// CTAP2.1 `minPinLength`, registration only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pin_length: Option<bool>,

    /// CTAP2.1 `credBlob` to store with a new credential, at most 32 bytes on most authenticators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_blob: Option<Bytes>,

    /// CTAP2.1 `credBlob` retrieval on authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_cred_blob: Option<bool>,

    /// Ask the client to report credential properties.
    /// <https://w3c.github.io/webauthn/#sctn-authenticator-credential-properties-extension>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<bool>,
}

/// Protection levels of the `credProtect` extension. The authenticator reports the level it
/// applied as an integer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum CredentialProtectionPolicy {
    /// Level 1
    UserVerificationOptional,
    /// Level 2
    #[serde(rename = "userVerificationOptionalWithCredentialIDList")]
    UserVerificationOptionalWithCredentialIdList,
    /// Level 3
    UserVerificationRequired,
}

impl CredentialProtectionPolicy {
    /// The CTAP2 integer for this level.
    pub fn level(&self) -> u8 {
        match self {
            Self::UserVerificationOptional => 1,
            Self::UserVerificationOptionalWithCredentialIdList => 2,
            Self::UserVerificationRequired => 3,
        }
    }

    /// The policy for a CTAP2 integer level.
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Self::UserVerificationOptional),
            2 => Some(Self::UserVerificationOptionalWithCredentialIdList),
            3 => Some(Self::UserVerificationRequired),
            _ => None,
        }
    }
}

/// Salts for the `hmac-secret` extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HmacGetSecretInput {
    /// First 32 byte salt
    pub salt1: Bytes,
    /// Optional second 32 byte salt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt2: Option<Bytes>,
}

/// Client extension outputs reported next to the authenticator response.
///
/// <https://w3c.github.io/webauthn/#dictdef-authenticationextensionsclientoutputs>
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExtensionsClientOutputs {
    /// Output of `credProps`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<CredentialPropertiesOutput>,

    /// Client side view of `hmacCreateSecret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_create_secret: Option<bool>,
}

/// <https://w3c.github.io/webauthn/#dictdef-credentialpropertiesoutput>
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialPropertiesOutput {
    /// Whether the credential is discoverable, absent when the client could not tell.
    #[serde(default, rename = "rk", skip_serializing_if = "Option::is_none")]
    pub discoverable: Option<bool>,
}
