//! # WebAuthn RP
//!
//! [![github]](https://github.com/webauthn-rp/webauthn-rp/tree/main/webauthn-rp)
//! [![version]](https://crates.io/crates/webauthn-rp)
//! [![documentation]](https://docs.rs/webauthn-rp/)
//!
//! This crate verifies the responses a browser returns for the two [WebAuthn] ceremonies:
//!
//! * [`RegistrationValidator::validate_attestation`] checks a newly created credential, its
//!   attestation statement and trust path, and stores the resulting
//!   [`PublicKeyCredentialSource`](webauthn_rp_types::PublicKeyCredentialSource).
//! * [`AuthenticationValidator::validate_assertion`] checks an assertion against the stored
//!   credential and returns the [`AuthenticationOutcome`] to persist.
//!
//! Each ceremony runs as a [`Pipeline`] of steps built from the [`RelyingPartyPolicy`] and the
//! ceremony options. The first failing step ends the ceremony with a [`CeremonyError`].
//!
//! Storage, trust anchors and time are supplied by the relying party through
//! [`CredentialSourceRepository`],
//! [`TrustAnchorProvider`](webauthn_rp_attestation::TrustAnchorProvider) and
//! [`Clock`](webauthn_rp_attestation::Clock). This crate performs no network I/O.
//!
//! [github]: https://img.shields.io/badge/GitHub-webauthn--rp%2Fwebauthn--rp%2Fwebauthn--rp-informational?logo=github&style=flat
//! [version]: https://img.shields.io/crates/v/webauthn-rp?logo=rust&style=flat
//! [documentation]: https://img.shields.io/docsrs/webauthn-rp/latest?logo=docs.rs&style=flat
//! [WebAuthn]: https://w3c.github.io/webauthn/

mod authentication;
mod counter;
mod error;
pub mod extensions;
#[cfg(test)]
mod fixtures;
mod origin;
mod pipeline;
mod policy;
mod registration;
mod repository;
mod request;
pub mod token_binding;

pub use self::{
    authentication::{
        AuthenticationOutcome, AuthenticationStep, AuthenticationValidator, CounterUpdate,
    },
    counter::{CounterGuard, CounterVerdict},
    error::CeremonyError,
    origin::OriginVerifier,
    pipeline::Pipeline,
    policy::RelyingPartyPolicy,
    registration::{RegistrationStep, RegistrationValidator},
    repository::{CredentialSourceRepository, MemoryRepository, RepositoryError},
    request::RequestContext,
};

#[cfg(feature = "testable")]
pub use self::{repository::MockCredentialSourceRepository, token_binding::MockTokenBindingHandler};
