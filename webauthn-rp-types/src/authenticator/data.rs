use ciborium::value::Value;

use super::{Aaguid, CoseKeyError, CredentialPublicKey, Flags};
use crate::{crypto::sha256, utils::cbor};

/// rpIdHash (32 bytes) + flags (1 byte) + signCount (4 bytes)
const MIN_LEN: usize = 37;

/// Failure to decode authenticator data or an attestation object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes than the flags promise.
    #[error("authenticator data is truncated")]
    TruncatedInput,
    /// The attested credential public key is not a valid `COSE_Key`.
    #[error("invalid credential public key: {0}")]
    InvalidCredentialPublicKey(#[from] CoseKeyError),
    /// The extension outputs are not a CBOR map keyed by extension identifiers.
    #[error("extension outputs are not a text keyed CBOR map")]
    InvalidExtensions,
    /// Bytes remain after every structure the flags announce.
    #[error("{len} unexpected trailing bytes in authenticator data")]
    TrailingData {
        /// Number of leftover bytes
        len: usize,
    },
    /// The attestation object map is malformed.
    #[error("malformed attestation object: {0}")]
    MalformedAttestationObject(String),
}

/// The authenticator data structure encodes the contextual bindings made by the authenticator:
/// which RP ID the credential is scoped to, whether the user was present and verified, the
/// signature counter and, during registration, the attested credential.
///
/// Decoding keeps the exact input bytes. Signatures are always checked over [`Self::raw`], never
/// over a re-encoding.
///
/// <https://w3c.github.io/webauthn/#sctn-authenticator-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    rp_id_hash: [u8; 32],
    flags: Flags,
    sign_count: u32,
    attested_credential_data: Option<AttestedCredentialData>,
    extensions: Option<Value>,
    raw: Vec<u8>,
}

impl AuthenticatorData {
    /// Build authenticator data for an RP ID with the user present flag set.
    ///
    /// Mostly useful to produce synthetic responses, relying parties receive authenticator data
    /// through [`Self::from_slice`].
    pub fn new(rp_id: &str, sign_count: u32) -> Self {
        let mut data = Self {
            rp_id_hash: sha256(rp_id.as_bytes()),
            flags: Flags::UP,
            sign_count,
            attested_credential_data: None,
            extensions: None,
            raw: Vec::new(),
        };
        data.raw = data.encode();
        data
    }

    /// Add an [`AttestedCredentialData`], this sets [`Flags::AT`] as well.
    pub fn set_attested_credential_data(mut self, acd: AttestedCredentialData) -> Self {
        self.attested_credential_data = Some(acd);
        self.flags |= Flags::AT;
        self.raw = self.encode();
        self
    }

    /// Add extension outputs, this sets [`Flags::ED`] as well.
    pub fn set_extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self.flags |= Flags::ED;
        self.raw = self.encode();
        self
    }

    /// Replace the flags wholesale. [`Flags::AT`] and [`Flags::ED`] are kept in line with the
    /// structures present.
    pub fn set_flags(mut self, flags: Flags) -> Self {
        let mut flags = flags - Flags::AT - Flags::ED;
        if self.attested_credential_data.is_some() {
            flags |= Flags::AT;
        }
        if self.extensions.is_some() {
            flags |= Flags::ED;
        }
        self.flags = flags;
        self.raw = self.encode();
        self
    }

    /// SHA-256 hash of the RP ID the credential is scoped to.
    pub fn rp_id_hash(&self) -> &[u8; 32] {
        &self.rp_id_hash
    }

    /// See [`Flags`].
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Signature counter, `0` when the authenticator does not implement one.
    pub fn sign_count(&self) -> u32 {
        self.sign_count
    }

    /// Present only when [`Flags::AT`] is set.
    pub fn attested_credential_data(&self) -> Option<&AttestedCredentialData> {
        self.attested_credential_data.as_ref()
    }

    /// Authenticator extension outputs, present only when [`Flags::ED`] is set. Always a map with
    /// text keys.
    pub fn extensions(&self) -> Option<&Value> {
        self.extensions.as_ref()
    }

    /// The exact bytes this value was decoded from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Decode authenticator data.
    ///
    /// The attested credential data and the extension map are only read when their flags are set,
    /// and together they must consume the input exactly.
    pub fn from_slice(v: &[u8]) -> Result<Self, DecodeError> {
        if v.len() < MIN_LEN {
            return Err(DecodeError::TruncatedInput);
        }

        let mut input = v;
        let rp_id_hash = *take::<32>(&mut input)?;
        let [flag_byte] = *take::<1>(&mut input)?;
        let flags = Flags::from(flag_byte);
        let sign_count = u32::from_be_bytes(*take::<4>(&mut input)?);

        let attested_credential_data = flags
            .contains(Flags::AT)
            .then(|| AttestedCredentialData::read_from(&mut input))
            .transpose()?;
        let extensions = flags
            .contains(Flags::ED)
            .then(|| read_extensions(&mut input))
            .transpose()?;

        if !input.is_empty() {
            return Err(DecodeError::TrailingData { len: input.len() });
        }

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
            raw: v.to_vec(),
        })
    }

    /// Encode to the wire representation. For decoded values this equals [`Self::raw`].
    pub fn to_vec(&self) -> Vec<u8> {
        self.raw.clone()
    }

    fn encode(&self) -> Vec<u8> {
        self.rp_id_hash
            .into_iter()
            .chain(std::iter::once(self.flags.into()))
            .chain(self.sign_count.to_be_bytes())
            .chain(
                self.attested_credential_data
                    .iter()
                    .flat_map(AttestedCredentialData::to_vec),
            )
            .chain(self.extensions.iter().flat_map(cbor::to_vec))
            .collect()
    }
}

/// Split `N` bytes off the front of `input`.
fn take<'a, const N: usize>(input: &mut &'a [u8]) -> Result<&'a [u8; N], DecodeError> {
    let bytes: &'a [u8] = *input;
    let (head, rest) = bytes
        .split_first_chunk::<N>()
        .ok_or(DecodeError::TruncatedInput)?;
    *input = rest;
    Ok(head)
}

fn read_extensions(input: &mut &[u8]) -> Result<Value, DecodeError> {
    let value: Value =
        ciborium::de::from_reader(input).map_err(|_| DecodeError::InvalidExtensions)?;
    match &value {
        Value::Map(entries) if entries.iter().all(|(k, _)| k.is_text()) => Ok(value),
        _ => Err(DecodeError::InvalidExtensions),
    }
}

/// Attested credential data is appended to the authenticator data when an authenticator creates
/// a credential.
///
/// <https://w3c.github.io/webauthn/#attested-credential-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    /// The AAGUID of the authenticator.
    pub aaguid: Aaguid,

    credential_id: Vec<u8>,

    credential_public_key: CredentialPublicKey,

    /// The `COSE_Key` bytes exactly as the authenticator emitted them.
    public_key_bytes: Vec<u8>,
}

impl AttestedCredentialData {
    /// Create a new [`AttestedCredentialData`].
    ///
    /// Returns `None` if the credential ID is longer than a `u16` length prefix allows.
    pub fn new(
        aaguid: Aaguid,
        credential_id: Vec<u8>,
        credential_public_key: CredentialPublicKey,
    ) -> Option<Self> {
        u16::try_from(credential_id.len()).ok()?;
        let public_key_bytes = credential_public_key.to_vec();
        Some(Self {
            aaguid,
            credential_id,
            credential_public_key,
            public_key_bytes,
        })
    }

    /// Get read access to the credential ID
    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// The decoded credential public key
    pub fn credential_public_key(&self) -> &CredentialPublicKey {
        &self.credential_public_key
    }

    /// The credential public key as received, suitable for storage.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    fn to_vec(&self) -> Vec<u8> {
        let id_len = u16::try_from(self.credential_id.len()).unwrap_or(u16::MAX);
        self.aaguid
            .0
            .into_iter()
            .chain(id_len.to_be_bytes())
            .chain(self.credential_id.iter().copied())
            .chain(self.public_key_bytes.iter().copied())
            .collect()
    }

    /// Read attested credential data off the front of `input`, leaving what follows it.
    fn read_from(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let aaguid = *take::<{ Aaguid::LEN }>(input)?;
        let id_len: usize = u16::from_be_bytes(*take::<2>(input)?).into();
        let bytes: &[u8] = *input;
        if bytes.len() < id_len {
            return Err(DecodeError::TruncatedInput);
        }
        let (credential_id, rest) = bytes.split_at(id_len);
        let credential_id = credential_id.to_vec();
        *input = rest;

        let key_start = *input;
        let value: Value = ciborium::de::from_reader(&mut *input)
            .map_err(|_| DecodeError::InvalidCredentialPublicKey(CoseKeyError::Cbor))?;
        let (public_key_bytes, _) = key_start.split_at(key_start.len() - input.len());
        let public_key_bytes = public_key_bytes.to_vec();
        let credential_public_key = CredentialPublicKey::from_cbor_value(value)?;

        Ok(Self {
            aaguid: Aaguid(aaguid),
            credential_id,
            credential_public_key,
            public_key_bytes,
        })
    }
}

#[cfg(test)]
mod tests;
