//! # WebAuthn RP Types
//!
//! Rust type definitions used by a WebAuthn relying party to verify registration and
//! authentication ceremonies.
//!
//! * [`authenticator`] holds the binary structures an authenticator signs: authenticator data,
//!   attested credential data, COSE credential keys and the attestation object.
//! * [`webauthn`] holds the JSON dictionaries exchanged with the browser.
//! * [`trust`] describes how an attestation is trusted and the anchor material used to decide it.
//! * [`PublicKeyCredentialSource`] is the record a relying party persists per credential.

mod utils;

pub mod authenticator;
pub mod trust;
pub mod webauthn;

mod credential_source;

// Re-exports
pub use self::{
    credential_source::PublicKeyCredentialSource,
    utils::{
        bytes::{Bytes, NotBase64Encoded},
        crypto, encoding,
    },
};
