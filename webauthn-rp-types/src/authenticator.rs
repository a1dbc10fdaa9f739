//! Binary structures produced and signed by authenticators.
//!
//! [`AuthenticatorData::from_slice`] is the entry point for both ceremonies, registration responses
//! arrive wrapped in an [`AttestationObject`].

mod aaguid;
mod attestation_object;
mod cose;
mod data;
mod flags;

pub use self::{
    aaguid::Aaguid,
    attestation_object::{AttestationObject, AttestationStatement},
    cose::{CoseKeyError, CredentialPublicKey},
    data::{AttestedCredentialData, AuthenticatorData, DecodeError},
    flags::Flags,
};
