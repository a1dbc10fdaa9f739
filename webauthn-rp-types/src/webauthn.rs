//! The WebAuthn Level 3 JSON types a relying party exchanges with the client.
//!
//! <https://w3c.github.io/webauthn>

use serde::{Deserialize, Serialize};

use crate::{utils::serde::ignore_unknown, Bytes};

mod assertion;
mod attestation;
mod client_data;
mod common;
mod extensions;

// re-export types
pub use self::{assertion::*, attestation::*, client_data::*, common::*, extensions::*};

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::AuthenticatorAssertionResponse {}
    impl Sealed for super::AuthenticatorAttestationResponse {}
}

/// Marker trait for response types
pub trait AuthenticatorResponse: sealed::Sealed {}

impl AuthenticatorResponse for AuthenticatorAssertionResponse {}
impl AuthenticatorResponse for AuthenticatorAttestationResponse {}

/// A credential as posted back by the client after a ceremony.
///
/// Use the aliases [`CreatedPublicKeyCredential`] and [`AuthenticatedPublicKeyCredential`].
///
/// <https://w3c.github.io/webauthn/#iface-pkcredential>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential<R: AuthenticatorResponse> {
    /// Base64url encoding of [`Self::raw_id`]
    pub id: String,

    /// The credential ID
    pub raw_id: Bytes,

    /// Always [`PublicKeyCredentialType::PublicKey`] for valid credentials
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: PublicKeyCredentialType,

    /// The authenticator's response
    pub response: R,

    /// Modality of the authenticator the client talked to
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    /// Client extension outputs
    #[serde(default)]
    pub client_extension_results: AuthenticationExtensionsClientOutputs,
}
