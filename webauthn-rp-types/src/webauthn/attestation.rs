//! Types specific to public key credential creation
use coset::iana;
use serde::{Deserialize, Serialize};

use crate::{
    utils::serde::{i64_to_iana, ignore_unknown, ignore_unknown_vec},
    webauthn::{
        AuthenticationExtensionsClientInputs, AuthenticatorAttachment, AuthenticatorTransport,
        PublicKeyCredential, PublicKeyCredentialDescriptor, PublicKeyCredentialType,
        UserVerificationRequirement,
    },
    Bytes,
};

/// The response to the successful creation of a PublicKeyCredential
pub type CreatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAttestationResponse>;

/// Options the relying party generated when it started a registration ceremony.
///
/// The relying party keeps these server side and hands them back to the validator together with
/// the client's response. They are single use.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialcreationoptions>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    /// The relying party responsible for the request.
    pub rp: PublicKeyCredentialRpEntity,

    /// The user account the credential is created for.
    pub user: PublicKeyCredentialUserEntity,

    /// The challenge the authenticator signs over, through the client data.
    pub challenge: Bytes,

    /// Acceptable credential algorithms, most preferred first.
    #[serde(deserialize_with = "ignore_unknown_vec")]
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,

    /// Ceremony timeout hint in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Credentials already registered for this user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,

    /// Requirements the authenticator has to meet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,

    /// Attestation conveyance preference.
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub attestation: AttestationConveyancePreference,

    /// Extension inputs sent to the client.
    #[serde(default)]
    pub extensions: AuthenticationExtensionsClientInputs,
}

impl PublicKeyCredentialCreationOptions {
    /// The user verification requirement, [`UserVerificationRequirement::Preferred`] when the
    /// relying party did not state one.
    pub fn user_verification(&self) -> UserVerificationRequirement {
        self.authenticator_selection
            .as_ref()
            .map(|selection| selection.user_verification)
            .unwrap_or_default()
    }
}

/// Relying party attributes for a new credential.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialrpentity>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyCredentialRpEntity {
    /// The RP ID. When omitted the effective domain of the request is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human palatable name of the relying party
    pub name: String,
}

/// User account attributes for a new credential.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialuserentity>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    /// The user handle, at most 64 opaque bytes.
    pub id: Bytes,

    /// Name shown when selecting the account
    pub display_name: String,

    /// Human palatable account identifier
    pub name: String,
}

/// A credential type and algorithm the relying party accepts.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialparameters>
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyCredentialParameters {
    /// Credential type
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: PublicKeyCredentialType,

    /// COSE algorithm identifier
    #[serde(with = "i64_to_iana")]
    pub alg: iana::Algorithm,
}

impl PublicKeyCredentialParameters {
    /// A `public-key` parameter for `alg`.
    pub fn public_key(alg: iana::Algorithm) -> Self {
        Self {
            ty: PublicKeyCredentialType::PublicKey,
            alg,
        }
    }

    /// The list to use when [`PublicKeyCredentialCreationOptions::pub_key_cred_params`] is empty:
    /// ES256 and RS256.
    ///
    /// <https://w3c.github.io/webauthn/#dom-publickeycredentialcreationoptions-pubkeycredparams>
    pub fn default_algorithms() -> Vec<Self> {
        vec![
            Self::public_key(iana::Algorithm::ES256),
            Self::public_key(iana::Algorithm::RS256),
        ]
    }
}

/// Authenticator requirements attached to a registration.
///
/// <https://w3c.github.io/webauthn/#dictdef-authenticatorselectioncriteria>
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    /// Restrict the authenticator attachment modality
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    /// Whether a discoverable credential is requested
    #[serde(default)]
    pub require_resident_key: bool,

    /// User verification requirement for the ceremony
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub user_verification: UserVerificationRequirement,
}

/// Whether the relying party wants to receive attestation.
///
/// <https://w3c.github.io/webauthn/#enumdef-attestationconveyancepreference>
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    /// No attestation wanted
    #[default]
    None,
    /// Attestation may be anonymized by the client
    Indirect,
    /// Attestation as produced by the authenticator
    Direct,
    /// Uniquely identifying attestation for managed deployments
    Enterprise,
}

/// Registered attestation statement format identifiers.
///
/// <https://www.iana.org/assignments/webauthn/webauthn.xhtml#webauthn-attestation-statement-format-ids>
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttestationFormat {
    /// WebAuthn-optimized compact format, with certificate, ECDAA or self attestation
    Packed,
    /// TPM 2.0 attestation
    Tpm,
    /// Android hardware backed key attestation
    AndroidKey,
    /// Android SafetyNet API attestation
    AndroidSafetynet,
    /// FIDO U2F authenticators
    FidoU2f,
    /// Apple anonymous attestation
    Apple,
    /// No attestation
    None,
}

/// The authenticator's response to a credential creation request.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorattestationresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    /// Exact JSON bytes of the client data, the hash of these bytes is what gets signed.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// The CBOR attestation object holding the authenticator data and attestation statement.
    pub attestation_object: Bytes,

    /// Transports the client believes the authenticator supports. Relying parties should store
    /// them with the credential.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "ignore_unknown_vec"
    )]
    pub transports: Vec<AuthenticatorTransport>,
}
