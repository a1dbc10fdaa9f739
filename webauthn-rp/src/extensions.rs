//! Checks of the extension outputs returned with a ceremony response, as defined in
//! [WebAuthn Defined Extensions][webauthn] and [CTAP2 Defined Extensions][ctap2].
//!
//! Authenticator outputs arrive as a CBOR map in the authenticator data. Every key of that map
//! needs a registered [`ExtensionHandler`], and a handler only accepts an output for an
//! extension the relying party requested. The built in handlers are:
//! * [`credProtect`][credprotect]
//! * [`hmac-secret`][hmacsecret]
//! * [`minPinLength`][minpinlength]
//! * [`credBlob`][credblob]
//!
//! [ctap2]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-defined-extensions
//! [webauthn]: https://w3c.github.io/webauthn/#sctn-defined-extensions
//! [credprotect]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-credProtect-extension
//! [hmacsecret]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-hmac-secret-extension
//! [minpinlength]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-minpinlength-extension
//! [credblob]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-credBlob-extension

use std::{collections::HashMap, fmt};

use ciborium::value::Value;
use webauthn_rp_types::webauthn::{
    AuthenticationExtensionsClientInputs, AuthenticationExtensionsClientOutputs,
    CredentialProtectionPolicy,
};

use crate::CeremonyError;

/// The ceremony an extension output was returned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceremony {
    /// `navigator.credentials.create()`
    Registration,
    /// `navigator.credentials.get()`
    Authentication,
}

/// Validates the authenticator output of one extension.
pub trait ExtensionHandler {
    /// The extension identifier, the key of its output in the authenticator data.
    fn identifier(&self) -> &'static str;

    /// Accept `output` given the extension inputs the relying party requested.
    fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        output: &Value,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError>;
}

fn unprocessable(identifier: &str, reason: &str) -> CeremonyError {
    CeremonyError::UnprocessableExtension(format!("{identifier}: {reason}"))
}

fn not_requested(identifier: &str) -> CeremonyError {
    unprocessable(identifier, "returned but not requested")
}

/// `credProtect`: the protection level the authenticator applied to a new credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredProtectHandler;

impl ExtensionHandler for CredProtectHandler {
    fn identifier(&self) -> &'static str {
        "credProtect"
    }

    fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        output: &Value,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError> {
        let id = self.identifier();
        if ceremony != Ceremony::Registration {
            return Err(unprocessable(id, "only defined for registration"));
        }
        let Some(wanted) = requested.credential_protection_policy else {
            return Err(not_requested(id));
        };
        let applied = output
            .as_integer()
            .and_then(|level| u64::try_from(level).ok())
            .and_then(CredentialProtectionPolicy::from_level)
            .ok_or_else(|| unprocessable(id, "not a protection level"))?;
        if requested.enforce_credential_protection_policy == Some(true) && applied < wanted {
            return Err(unprocessable(id, "weaker than the enforced policy"));
        }
        Ok(())
    }
}

/// `hmac-secret`: a flag on registration, encrypted outputs on authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacSecretHandler;

impl ExtensionHandler for HmacSecretHandler {
    fn identifier(&self) -> &'static str {
        "hmac-secret"
    }

    fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        output: &Value,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError> {
        let id = self.identifier();
        match ceremony {
            Ceremony::Registration => {
                if requested.hmac_create_secret != Some(true) {
                    return Err(not_requested(id));
                }
                if !output.is_bool() {
                    return Err(unprocessable(id, "not a boolean"));
                }
            }
            Ceremony::Authentication => {
                if requested.hmac_get_secret.is_none() {
                    return Err(not_requested(id));
                }
                // One or two salts, encrypted with PIN/UV protocol 1 or 2
                if !output
                    .as_bytes()
                    .is_some_and(|out| matches!(out.len(), 32 | 48 | 64 | 80))
                {
                    return Err(unprocessable(id, "not an encrypted secret"));
                }
            }
        }
        Ok(())
    }
}

/// `minPinLength`: the authenticator's minimum PIN length, registration only.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinPinLengthHandler;

impl ExtensionHandler for MinPinLengthHandler {
    fn identifier(&self) -> &'static str {
        "minPinLength"
    }

    fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        output: &Value,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError> {
        let id = self.identifier();
        if ceremony != Ceremony::Registration {
            return Err(unprocessable(id, "only defined for registration"));
        }
        if requested.min_pin_length != Some(true) {
            return Err(not_requested(id));
        }
        match output.as_integer().map(u64::try_from) {
            Some(Ok(_)) => Ok(()),
            _ => Err(unprocessable(id, "not an unsigned integer")),
        }
    }
}

/// `credBlob`: whether the blob was stored on registration, the blob itself on authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredBlobHandler;

impl ExtensionHandler for CredBlobHandler {
    fn identifier(&self) -> &'static str {
        "credBlob"
    }

    fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        output: &Value,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError> {
        let id = self.identifier();
        let (was_requested, well_typed) = match ceremony {
            Ceremony::Registration => (requested.cred_blob.is_some(), output.is_bool()),
            Ceremony::Authentication => (requested.get_cred_blob == Some(true), output.is_bytes()),
        };
        if !was_requested {
            return Err(not_requested(id));
        }
        if !well_typed {
            return Err(unprocessable(id, "unexpected output type"));
        }
        Ok(())
    }
}

/// Validates returned extension outputs against the requested inputs.
pub struct ExtensionChecker {
    handlers: HashMap<&'static str, Box<dyn ExtensionHandler>>,
}

impl ExtensionChecker {
    /// A checker without any handler, rejecting every authenticator extension output.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add or replace the handler for `handler.identifier()`.
    pub fn with_handler(mut self, handler: impl ExtensionHandler + 'static) -> Self {
        self.handlers.insert(handler.identifier(), Box::new(handler));
        self
    }

    /// Identifiers of the extensions this checker accepts outputs for.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Check the authenticator extension outputs of a response.
    ///
    /// Extensions that were requested but not returned are not an error, authenticators are
    /// free to ignore extensions.
    pub fn check(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        returned: Option<&Value>,
        ceremony: Ceremony,
    ) -> Result<(), CeremonyError> {
        let Some(returned) = returned else {
            return Ok(());
        };
        let Value::Map(outputs) = returned else {
            return Err(CeremonyError::UnprocessableExtension(
                "extension outputs are not a map".into(),
            ));
        };

        for (key, output) in outputs {
            let identifier = key.as_text().ok_or_else(|| {
                CeremonyError::UnprocessableExtension("extension identifier is not text".into())
            })?;
            let handler = self.handlers.get(identifier).ok_or_else(|| {
                log::warn!("no handler for returned extension {identifier}");
                unprocessable(identifier, "unknown extension")
            })?;
            handler.check(requested, output, ceremony)?;
            log::debug!("accepted {identifier} extension output");
        }
        Ok(())
    }

    /// Check the client extension outputs of a response. Only outputs for requested extensions
    /// may be present.
    pub fn check_client_outputs(
        &self,
        requested: &AuthenticationExtensionsClientInputs,
        outputs: &AuthenticationExtensionsClientOutputs,
    ) -> Result<(), CeremonyError> {
        if outputs.cred_props.is_some() && requested.cred_props != Some(true) {
            return Err(not_requested("credProps"));
        }
        if outputs.hmac_create_secret.is_some() && requested.hmac_create_secret != Some(true) {
            return Err(not_requested("hmacCreateSecret"));
        }
        Ok(())
    }
}

impl Default for ExtensionChecker {
    /// A checker with every built in handler.
    fn default() -> Self {
        Self::empty()
            .with_handler(CredProtectHandler)
            .with_handler(HmacSecretHandler)
            .with_handler(MinPinLengthHandler)
            .with_handler(CredBlobHandler)
    }
}

impl fmt::Debug for ExtensionChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identifiers: Vec<_> = self.identifiers().collect();
        identifiers.sort_unstable();
        f.debug_struct("ExtensionChecker")
            .field("handlers", &identifiers)
            .finish()
    }
}
