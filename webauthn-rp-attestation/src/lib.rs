//! # WebAuthn RP Attestation
//!
//! [![github]](https://github.com/webauthn-rp/webauthn-rp/tree/main/webauthn-rp-attestation)
//! [![version]](https://crates.io/crates/webauthn-rp-attestation)
//! [![documentation]](https://docs.rs/webauthn-rp-attestation/)
//!
//! This crate verifies the attestation statement an authenticator returns when it creates a
//! credential, and evaluates the resulting trust path against the anchors a relying party
//! configures.
//!
//! Verification happens in two steps:
//!
//! 1. An [`AttestationStatementRegistry`] picks the verifier for the statement's format and
//!    checks it against the authenticator data and client data hash. Every format of the
//!    [WebAuthn attestation statement format registry] is supported. The result is a
//!    [`TrustPath`](webauthn_rp_types::trust::TrustPath).
//! 2. A [`TrustPathEvaluator`] decides whether that trust path leads to an anchor provided by a
//!    [`TrustAnchorProvider`].
//!
//! Time is read through the [`Clock`] trait so certificate validity and SafetyNet freshness can
//! be tested deterministically.
//!
//! [github]: https://img.shields.io/badge/GitHub-webauthn--rp%2Fwebauthn--rp%2Fwebauthn--rp--attestation-informational?logo=github&style=flat
//! [version]: https://img.shields.io/crates/v/webauthn-rp-attestation?logo=rust&style=flat
//! [documentation]: https://img.shields.io/docsrs/webauthn-rp-attestation/latest?logo=docs.rs&style=flat
//! [WebAuthn attestation statement format registry]: https://www.iana.org/assignments/webauthn/webauthn.xhtml

mod clock;
pub mod crypto;
mod error;
pub mod formats;
mod registry;
mod trust;
mod x509;

pub use self::{
    clock::{Clock, FixedClock, SystemClock},
    crypto::PublicKey,
    error::{AttestationError, TrustError},
    formats::{AttestationStatementVerifier, SafetyNetPolicy, Verifier},
    registry::AttestationStatementRegistry,
    trust::{
        AnchorKey, EcdaaVerifier, MemoryTrustAnchorProvider, TrustAnchorProvider,
        TrustPathEvaluator, Trusted,
    },
};

#[cfg(feature = "testable")]
pub use self::{
    clock::MockClock,
    trust::{MockEcdaaVerifier, MockTrustAnchorProvider},
};
