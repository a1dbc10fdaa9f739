use std::fmt;

use webauthn_rp_attestation::{AttestationError, PublicKey};
use webauthn_rp_types::{
    authenticator::AuthenticatorData,
    webauthn::{
        AuthenticatedPublicKeyCredential, ClientDataType, PublicKeyCredentialRequestOptions,
    },
    Bytes, PublicKeyCredentialSource,
};

use crate::{
    counter::{CounterGuard, CounterVerdict},
    extensions::{Ceremony, ExtensionChecker},
    pipeline::{self, CeremonyState, Pipeline},
    token_binding::{self, TokenBindingHandler, TokenBindingNotSupportedHandler},
    CeremonyError, CredentialSourceRepository, OriginVerifier, RelyingPartyPolicy,
    RequestContext,
};

/// The checks of an authentication ceremony, in their canonical order.
///
/// <https://w3c.github.io/webauthn/#sctn-verifying-assertion>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationStep {
    /// The credential is one of `allowCredentials`, when the options list any.
    VerifyAllowedCredential,
    /// Load the stored credential source for the credential ID.
    LookupCredential,
    /// The returned user handle, if any, is the one the credential was registered for.
    VerifyUserHandle,
    /// Parse `clientDataJSON` and hash its exact bytes.
    ParseClientData,
    /// The client data type is `webauthn.get`.
    VerifyType,
    /// The client data challenge is the one of the request options.
    VerifyChallenge,
    /// The client data origin may act for the RP ID.
    VerifyOrigin,
    /// The token binding handler accepts the client's token binding.
    VerifyTokenBinding,
    /// The client reports a token binding, for RP IDs that require one.
    RequireTokenBinding,
    /// Decode the authenticator data.
    DecodeAuthenticatorData,
    /// The authenticator data is scoped to the RP ID.
    VerifyRpIdHash,
    /// The user was present.
    VerifyUserPresence,
    /// The user was verified, when the options require it.
    VerifyUserVerification,
    /// The signature over `authenticatorData || SHA-256(clientDataJSON)` verifies with the stored
    /// credential key.
    VerifySignature,
    /// The signature counter moved forward.
    VerifySignCount,
    /// Extension outputs were requested and are consistent.
    VerifyExtensions,
}

impl fmt::Display for AuthenticationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VerifyAllowedCredential => "verify allowed credential",
            Self::LookupCredential => "lookup credential",
            Self::VerifyUserHandle => "verify user handle",
            Self::ParseClientData => "parse client data",
            Self::VerifyType => "verify type",
            Self::VerifyChallenge => "verify challenge",
            Self::VerifyOrigin => "verify origin",
            Self::VerifyTokenBinding => "verify token binding",
            Self::RequireTokenBinding => "require token binding",
            Self::DecodeAuthenticatorData => "decode authenticator data",
            Self::VerifyRpIdHash => "verify RP ID hash",
            Self::VerifyUserPresence => "verify user presence",
            Self::VerifyUserVerification => "verify user verification",
            Self::VerifySignature => "verify signature",
            Self::VerifySignCount => "verify sign count",
            Self::VerifyExtensions => "verify extensions",
        };
        f.write_str(name)
    }
}

/// The signature counter to persist for a credential after a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    /// The credential that authenticated.
    pub credential_id: Bytes,
    /// The counter stored before this ceremony.
    pub previous: u32,
    /// The counter to store. Stays at `previous` when the authenticator reports `0`.
    pub new: u32,
}

/// The result of a successful authentication.
///
/// Nothing is written by the validator, the relying party applies the outcome to its own storage,
/// for instance with [`AuthenticationOutcome::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    /// Counter change to persist.
    pub counter_update: CounterUpdate,
    /// The user the credential belongs to.
    pub user_handle: Bytes,
    /// Whether the authenticator verified the user.
    pub user_verified: bool,
    /// The backup state reported by the authenticator.
    pub backup_state: bool,
}

impl AuthenticationOutcome {
    /// The stored credential source updated with this outcome.
    pub fn apply(&self, source: PublicKeyCredentialSource) -> PublicKeyCredentialSource {
        source
            .with_sign_count(self.counter_update.new)
            .with_backup_state(self.backup_state)
    }
}

/// Validates authentication responses against stored credential sources.
///
/// ```
/// # use webauthn_rp::{AuthenticationValidator, RelyingPartyPolicy};
/// let validator = AuthenticationValidator::new(RelyingPartyPolicy::new(false));
/// ```
pub struct AuthenticationValidator {
    policy: RelyingPartyPolicy,
    origins: OriginVerifier,
    token_binding: Box<dyn TokenBindingHandler>,
    extensions: ExtensionChecker,
}

impl AuthenticationValidator {
    /// Create a validator enforcing `policy`.
    ///
    /// Token bindings reported as present are rejected until another
    /// [`TokenBindingHandler`] is set.
    pub fn new(policy: RelyingPartyPolicy) -> Self {
        Self {
            origins: OriginVerifier::from(&policy),
            policy,
            token_binding: Box::new(TokenBindingNotSupportedHandler),
            extensions: ExtensionChecker::default(),
        }
    }

    /// Check token bindings with `handler`.
    pub fn with_token_binding_handler(
        mut self,
        handler: impl TokenBindingHandler + 'static,
    ) -> Self {
        self.token_binding = Box::new(handler);
        self
    }

    /// Check extension outputs with `checker`.
    pub fn with_extension_checker(mut self, checker: ExtensionChecker) -> Self {
        self.extensions = checker;
        self
    }

    /// The policy this validator enforces.
    pub fn policy(&self) -> &RelyingPartyPolicy {
        &self.policy
    }

    /// The steps an authentication for `options` goes through.
    pub fn pipeline(
        &self,
        options: &PublicKeyCredentialRequestOptions,
        rp_id: &str,
    ) -> Pipeline<AuthenticationStep> {
        use AuthenticationStep::*;

        let steps = [
            Some(VerifyAllowedCredential),
            Some(LookupCredential),
            Some(VerifyUserHandle),
            Some(ParseClientData),
            Some(VerifyType),
            Some(VerifyChallenge),
            Some(VerifyOrigin),
            Some(VerifyTokenBinding),
            self.policy
                .requires_token_binding(rp_id)
                .then_some(RequireTokenBinding),
            Some(DecodeAuthenticatorData),
            Some(VerifyRpIdHash),
            Some(VerifyUserPresence),
            options
                .user_verification
                .is_required()
                .then_some(VerifyUserVerification),
            Some(VerifySignature),
            Some(VerifySignCount),
            Some(VerifyExtensions),
        ];
        Pipeline::new(steps.into_iter().flatten())
    }

    /// Validate an authentication response against the options it answers.
    ///
    /// The credential is looked up in `repository`, which is only read. A stalled or decreasing
    /// signature counter fails the ceremony with [`CeremonyError::CloneDetected`] once the
    /// signature has been verified.
    pub fn validate_assertion<R>(
        &self,
        credential: &AuthenticatedPublicKeyCredential,
        options: &PublicKeyCredentialRequestOptions,
        request: &RequestContext,
        repository: &R,
    ) -> Result<AuthenticationOutcome, CeremonyError>
    where
        R: CredentialSourceRepository + ?Sized,
    {
        let rp_id = pipeline::relying_party_id(options.rp_id.as_deref(), request)?;
        let mut authentication = Authentication {
            validator: self,
            credential,
            options,
            request,
            rp_id,
            state: CeremonyState::default(),
            source: None,
        };
        self.pipeline(options, rp_id)
            .run(|step| authentication.run(step, repository))?;
        authentication.into_outcome()
    }
}

impl fmt::Debug for AuthenticationValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationValidator")
            .field("policy", &self.policy)
            .field("origins", &self.origins)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

/// One authentication ceremony in progress.
struct Authentication<'a> {
    validator: &'a AuthenticationValidator,
    credential: &'a AuthenticatedPublicKeyCredential,
    options: &'a PublicKeyCredentialRequestOptions,
    request: &'a RequestContext,
    rp_id: &'a str,
    state: CeremonyState,
    source: Option<PublicKeyCredentialSource>,
}

impl Authentication<'_> {
    fn run<R>(&mut self, step: AuthenticationStep, repository: &R) -> Result<(), CeremonyError>
    where
        R: CredentialSourceRepository + ?Sized,
    {
        let response = &self.credential.response;
        match step {
            AuthenticationStep::VerifyAllowedCredential => self.verify_allowed_credential(),
            AuthenticationStep::LookupCredential => {
                let source = repository
                    .find_by_credential_id(&self.credential.raw_id)?
                    .ok_or(CeremonyError::CredentialNotFound)?;
                self.source = Some(source);
                Ok(())
            }
            AuthenticationStep::VerifyUserHandle => self.verify_user_handle(),
            AuthenticationStep::ParseClientData => {
                self.state.parse_client_data(&response.client_data_json)
            }
            AuthenticationStep::VerifyType => {
                pipeline::verify_type(self.state.client_data()?, ClientDataType::Get)
            }
            AuthenticationStep::VerifyChallenge => {
                pipeline::verify_challenge(self.state.client_data()?, &self.options.challenge)
            }
            AuthenticationStep::VerifyOrigin => self
                .validator
                .origins
                .assert_origin(&self.state.client_data()?.origin, self.rp_id),
            AuthenticationStep::VerifyTokenBinding => self.validator.token_binding.check(
                self.state.client_data()?.token_binding.as_ref(),
                self.request,
            ),
            AuthenticationStep::RequireTokenBinding => {
                token_binding::require_present(self.state.client_data()?.token_binding.as_ref())
            }
            AuthenticationStep::DecodeAuthenticatorData => {
                let auth_data = AuthenticatorData::from_slice(&response.authenticator_data)?;
                self.state.set_auth_data(auth_data);
                Ok(())
            }
            AuthenticationStep::VerifyRpIdHash => {
                pipeline::verify_rp_id_hash(self.state.auth_data()?, self.rp_id)
            }
            AuthenticationStep::VerifyUserPresence => {
                pipeline::verify_user_presence(self.state.auth_data()?)
            }
            AuthenticationStep::VerifyUserVerification => {
                pipeline::verify_user_verification(self.state.auth_data()?)
            }
            AuthenticationStep::VerifySignature => self.verify_signature(),
            AuthenticationStep::VerifySignCount => {
                let previous = self.source()?.sign_count;
                let received = self.state.auth_data()?.sign_count();
                match CounterGuard::check(previous, received) {
                    CounterVerdict::Accepted => Ok(()),
                    CounterVerdict::CloneDetected => {
                        Err(CeremonyError::CloneDetected { previous, received })
                    }
                }
            }
            AuthenticationStep::VerifyExtensions => {
                let requested = &self.options.extensions;
                self.validator.extensions.check(
                    requested,
                    self.state.auth_data()?.extensions(),
                    Ceremony::Authentication,
                )?;
                self.validator
                    .extensions
                    .check_client_outputs(requested, &self.credential.client_extension_results)
            }
        }
    }

    fn source(&self) -> Result<&PublicKeyCredentialSource, CeremonyError> {
        self.source
            .as_ref()
            .ok_or(CeremonyError::CredentialNotFound)
    }

    fn verify_allowed_credential(&self) -> Result<(), CeremonyError> {
        let allowed = &self.options.allow_credentials;
        let raw_id = self.credential.raw_id.as_slice();
        if allowed.is_empty() || allowed.iter().any(|d| d.id.as_slice() == raw_id) {
            Ok(())
        } else {
            log::warn!("credential of {} bytes is not in allowCredentials", raw_id.len());
            Err(CeremonyError::CredentialNotFound)
        }
    }

    /// A discoverable credential must name its user, the relying party has no other way to know
    /// who is signing in.
    fn verify_user_handle(&self) -> Result<(), CeremonyError> {
        let stored = &self.source()?.user_handle;
        match &self.credential.response.user_handle {
            Some(returned) if returned.as_slice() != stored.as_slice() => {
                Err(CeremonyError::UserHandleMismatch)
            }
            None if self.options.allow_credentials.is_empty() => {
                Err(CeremonyError::UserHandleMismatch)
            }
            _ => Ok(()),
        }
    }

    fn verify_signature(&self) -> Result<(), CeremonyError> {
        let credential_key = self.source()?.public_key()?;
        let alg = credential_key.algorithm();
        let key = PublicKey::from_credential_key(&credential_key).map_err(signature_error)?;

        let auth_data = self.state.auth_data()?;
        let signed: Vec<u8> = auth_data
            .raw()
            .iter()
            .chain(self.state.client_data_hash())
            .copied()
            .collect();
        key.verify(alg, &signed, &self.credential.response.signature)
            .map_err(signature_error)
    }

    fn into_outcome(self) -> Result<AuthenticationOutcome, CeremonyError> {
        let source = self.source()?;
        let auth_data = self.state.auth_data()?;
        let flags = auth_data.flags();
        let previous = source.sign_count;

        Ok(AuthenticationOutcome {
            counter_update: CounterUpdate {
                credential_id: source.credential_id.clone(),
                previous,
                new: previous.max(auth_data.sign_count()),
            },
            user_handle: source.user_handle.clone(),
            user_verified: flags.user_verified(),
            backup_state: flags.backed_up(),
        })
    }
}

fn signature_error(e: AttestationError) -> CeremonyError {
    match e {
        AttestationError::UnsupportedAlgorithm(alg) => CeremonyError::AlgorithmNotAllowed(alg),
        _ => CeremonyError::SignatureMismatch,
    }
}
