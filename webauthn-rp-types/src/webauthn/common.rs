//! Types shared by registration and authentication.

use serde::{Deserialize, Serialize};

use crate::{
    utils::serde::{ignore_unknown, ignore_unknown_vec},
    Bytes,
};

#[cfg(doc)]
use crate::webauthn::{PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions};

/// Valid credential types. `public-key` is the only one defined, anything else deserializes to
/// [`PublicKeyCredentialType::Unknown`] and must be ignored.
///
/// <https://w3c.github.io/webauthn/#enumdef-publickeycredentialtype>
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PublicKeyCredentialType {
    /// A public key credential
    PublicKey,
    /// Placeholder for values this library does not know
    #[default]
    Unknown,
}

/// Identifies a credential, used in [`PublicKeyCredentialCreationOptions::exclude_credentials`]
/// and [`PublicKeyCredentialRequestOptions::allow_credentials`].
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialdescriptor>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    /// Type of the credential referred to
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: PublicKeyCredentialType,

    /// The credential ID
    pub id: Bytes,

    /// Transports the credential was registered with, if the relying party stored them
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "ignore_unknown_vec"
    )]
    pub transports: Vec<AuthenticatorTransport>,
}

impl PublicKeyCredentialDescriptor {
    /// Descriptor for a public key credential ID.
    pub fn new(id: impl Into<Bytes>) -> Self {
        Self {
            ty: PublicKeyCredentialType::PublicKey,
            id: id.into(),
            transports: Vec::new(),
        }
    }
}

/// A relying party's requirement for user verification.
///
/// <https://w3c.github.io/webauthn/#enumdef-userverificationrequirement>
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    /// The ceremony fails unless the UV flag is set.
    Required,

    /// User verification is wanted but its absence does not fail the ceremony.
    #[default]
    Preferred,

    /// User verification should not be performed.
    Discouraged,
}

impl UserVerificationRequirement {
    /// Whether the UV flag must be set for the ceremony to succeed.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Hints as to how a client might reach an authenticator.
///
/// <https://w3c.github.io/webauthn/#enum-transport>
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorTransport {
    /// Removable USB
    Usb,
    /// Near Field Communication
    Nfc,
    /// Bluetooth Low Energy
    Ble,
    /// Smart cards
    #[serde(rename = "smart-card")]
    SmartCard,
    /// Cross device, e.g. a phone used to sign in on a desktop
    #[serde(alias = "cable")]
    Hybrid,
    /// Platform authenticator built into the client device
    Internal,
}

/// The attachment modality a client reports for the authenticator it used.
///
/// <https://w3c.github.io/webauthn/#enumdef-authenticatorattachment>
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    /// Built into the client device
    Platform,
    /// Removable, roaming between devices
    CrossPlatform,
}
