use serde::{Deserialize, Serialize};

use crate::{
    authenticator::{Aaguid, CoseKeyError, CredentialPublicKey},
    trust::TrustPath,
    utils::serde::ignore_unknown_vec,
    webauthn::{AttestationFormat, AuthenticatorTransport, PublicKeyCredentialType},
    Bytes,
};

/// The record a relying party keeps for every registered credential.
///
/// A registration ceremony produces it, authentication ceremonies read it. It is a snapshot: the
/// only value expected to change over its lifetime is [`Self::sign_count`], and that change is
/// applied by the relying party's storage from the counter update an authentication returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialSource {
    /// The credential ID chosen by the authenticator.
    pub credential_id: Bytes,

    /// Always [`PublicKeyCredentialType::PublicKey`]
    #[serde(rename = "type")]
    pub ty: PublicKeyCredentialType,

    /// Transports reported by the client at registration.
    #[serde(default, deserialize_with = "ignore_unknown_vec")]
    pub transports: Vec<AuthenticatorTransport>,

    /// Format of the attestation statement the credential was registered with.
    pub attestation_format: AttestationFormat,

    /// How the attestation was trusted at registration.
    pub trust_path: TrustPath,

    /// Model identifier of the authenticator, all zeroes when unknown.
    pub aaguid: Aaguid,

    /// `COSE_Key` encoding of the credential public key, as received.
    pub credential_public_key: Bytes,

    /// The user handle the credential belongs to.
    pub user_handle: Bytes,

    /// Last signature counter seen for this credential.
    pub sign_count: u32,

    /// Whether the credential may be synced to other devices. Fixed at creation.
    #[serde(default)]
    pub backup_eligible: bool,

    /// Whether the credential was backed up when last used.
    #[serde(default)]
    pub backup_state: bool,

    /// Whether the user was verified at registration.
    #[serde(default)]
    pub uv_initialized: bool,
}

impl PublicKeyCredentialSource {
    /// Decode [`Self::credential_public_key`].
    pub fn public_key(&self) -> Result<CredentialPublicKey, CoseKeyError> {
        CredentialPublicKey::from_slice(&self.credential_public_key)
    }

    /// A copy of this source carrying a new signature counter.
    pub fn with_sign_count(self, sign_count: u32) -> Self {
        Self { sign_count, ..self }
    }

    /// A copy of this source carrying a new backup state.
    pub fn with_backup_state(self, backup_state: bool) -> Self {
        Self {
            backup_state,
            ..self
        }
    }
}
