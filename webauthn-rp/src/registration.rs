use std::fmt;

use coset::iana::EnumI64;
use webauthn_rp_attestation::{
    formats::AndroidSafetyNetAttestation, AttestationStatementRegistry, Clock, EcdaaVerifier,
    TrustAnchorProvider, TrustPathEvaluator,
};
use webauthn_rp_types::{
    authenticator::{AttestationObject, AttestationStatement, AttestedCredentialData},
    trust::TrustPath,
    webauthn::{
        AttestationFormat, ClientDataType, CreatedPublicKeyCredential,
        PublicKeyCredentialCreationOptions, PublicKeyCredentialParameters,
        PublicKeyCredentialType,
    },
    PublicKeyCredentialSource,
};

use crate::{
    extensions::{Ceremony, ExtensionChecker},
    pipeline::{self, not_decoded, CeremonyState, Pipeline},
    token_binding::{self, TokenBindingHandler, TokenBindingNotSupportedHandler},
    CeremonyError, CredentialSourceRepository, OriginVerifier, RelyingPartyPolicy,
    RequestContext,
};

/// The checks of a registration ceremony, in their canonical order.
///
/// <https://w3c.github.io/webauthn/#sctn-registering-a-new-credential>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Parse `clientDataJSON` and hash its exact bytes.
    ParseClientData,
    /// The client data type is `webauthn.create`.
    VerifyType,
    /// The client data challenge is the one of the creation options.
    VerifyChallenge,
    /// The client data origin may act for the RP ID.
    VerifyOrigin,
    /// The token binding handler accepts the client's token binding.
    VerifyTokenBinding,
    /// The client reports a token binding, for RP IDs that require one.
    RequireTokenBinding,
    /// Decode the attestation object and its authenticator data.
    DecodeAttestationObject,
    /// The authenticator data is scoped to the RP ID.
    VerifyRpIdHash,
    /// The user was present.
    VerifyUserPresence,
    /// The user was verified, when the options require it.
    VerifyUserVerification,
    /// The credential algorithm is one of the requested `pubKeyCredParams`.
    VerifyAlgorithm,
    /// The attestation statement verifies for its format.
    VerifyAttestationStatement,
    /// The attestation trust path is acceptable under the relying party policy.
    EvaluateTrustPath,
    /// Extension outputs were requested and are consistent.
    VerifyExtensions,
    /// The credential ID is not registered yet.
    VerifyCredentialIsNew,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ParseClientData => "parse client data",
            Self::VerifyType => "verify type",
            Self::VerifyChallenge => "verify challenge",
            Self::VerifyOrigin => "verify origin",
            Self::VerifyTokenBinding => "verify token binding",
            Self::RequireTokenBinding => "require token binding",
            Self::DecodeAttestationObject => "decode attestation object",
            Self::VerifyRpIdHash => "verify RP ID hash",
            Self::VerifyUserPresence => "verify user presence",
            Self::VerifyUserVerification => "verify user verification",
            Self::VerifyAlgorithm => "verify algorithm",
            Self::VerifyAttestationStatement => "verify attestation statement",
            Self::EvaluateTrustPath => "evaluate trust path",
            Self::VerifyExtensions => "verify extensions",
            Self::VerifyCredentialIsNew => "verify credential is new",
        };
        f.write_str(name)
    }
}

/// Validates registration responses and creates the credential sources to persist.
///
/// ```
/// # use webauthn_rp::{RegistrationValidator, RelyingPartyPolicy};
/// # use webauthn_rp_attestation::{MemoryTrustAnchorProvider, SystemClock};
/// let validator = RegistrationValidator::new(
///     RelyingPartyPolicy::new(false),
///     MemoryTrustAnchorProvider::new(),
///     SystemClock,
/// );
/// ```
pub struct RegistrationValidator<P, C> {
    policy: RelyingPartyPolicy,
    origins: OriginVerifier,
    registry: AttestationStatementRegistry,
    evaluator: TrustPathEvaluator<P, C>,
    token_binding: Box<dyn TokenBindingHandler>,
    extensions: ExtensionChecker,
}

impl<P, C> RegistrationValidator<P, C>
where
    P: TrustAnchorProvider,
    C: Clock + Clone + Send + Sync + 'static,
{
    /// Create a validator accepting every attestation format, trusting the anchors of `anchors`
    /// and reading time from `clock`.
    ///
    /// Token bindings reported as present are rejected until another
    /// [`TokenBindingHandler`] is set.
    pub fn new(policy: RelyingPartyPolicy, anchors: P, clock: C) -> Self {
        let registry = AttestationStatementRegistry::with_default_formats().with_verifier(
            AndroidSafetyNetAttestation::new(policy.safetynet, clock.clone()),
        );
        Self {
            origins: OriginVerifier::from(&policy),
            policy,
            registry,
            evaluator: TrustPathEvaluator::new(anchors, clock),
            token_binding: Box::new(TokenBindingNotSupportedHandler),
            extensions: ExtensionChecker::default(),
        }
    }
}

impl<P, C> RegistrationValidator<P, C>
where
    P: TrustAnchorProvider,
    C: Clock,
{
    /// Verify attestation statements with `registry`, for instance to restrict the accepted
    /// formats.
    pub fn with_registry(mut self, registry: AttestationStatementRegistry) -> Self {
        self.registry = registry;
        self
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

    /// Verify ECDAA attestations with `verifier`.
    pub fn with_ecdaa_verifier(mut self, verifier: impl EcdaaVerifier + 'static) -> Self {
        self.evaluator = self.evaluator.with_ecdaa_verifier(verifier);
        self
    }

    /// The policy this validator enforces.
    pub fn policy(&self) -> &RelyingPartyPolicy {
        &self.policy
    }

    /// The steps a registration for `options` goes through.
    pub fn pipeline(
        &self,
        options: &PublicKeyCredentialCreationOptions,
        rp_id: &str,
    ) -> Pipeline<RegistrationStep> {
        use RegistrationStep::*;

        let steps = [
            Some(ParseClientData),
            Some(VerifyType),
            Some(VerifyChallenge),
            Some(VerifyOrigin),
            Some(VerifyTokenBinding),
            self.policy
                .requires_token_binding(rp_id)
                .then_some(RequireTokenBinding),
            Some(DecodeAttestationObject),
            Some(VerifyRpIdHash),
            Some(VerifyUserPresence),
            options
                .user_verification()
                .is_required()
                .then_some(VerifyUserVerification),
            Some(VerifyAlgorithm),
            Some(VerifyAttestationStatement),
            Some(EvaluateTrustPath),
            Some(VerifyExtensions),
            Some(VerifyCredentialIsNew),
        ];
        Pipeline::new(steps.into_iter().flatten())
    }

    /// Validate a registration response against the options it answers.
    ///
    /// On success the new credential source is saved to `repository` and returned. Nothing is
    /// saved when any step fails.
    pub fn validate_attestation<R>(
        &self,
        credential: &CreatedPublicKeyCredential,
        options: &PublicKeyCredentialCreationOptions,
        request: &RequestContext,
        repository: &mut R,
    ) -> Result<PublicKeyCredentialSource, CeremonyError>
    where
        R: CredentialSourceRepository + ?Sized,
    {
        let rp_id = pipeline::relying_party_id(options.rp.id.as_deref(), request)?;
        let mut registration = Registration {
            validator: self,
            credential,
            options,
            request,
            rp_id,
            state: CeremonyState::default(),
            statement: None,
            attested: None,
        };
        self.pipeline(options, rp_id)
            .run(|step| registration.run(step, &*repository))?;

        let source = registration.into_source()?;
        repository.save(source.clone())?;
        log::debug!(
            "registered {} byte credential with {} attestation",
            source.credential_id.len(),
            source.attestation_format
        );
        Ok(source)
    }
}

impl<P, C> fmt::Debug for RegistrationValidator<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationValidator")
            .field("policy", &self.policy)
            .field("origins", &self.origins)
            .field("registry", &self.registry)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

/// One registration ceremony in progress.
struct Registration<'a, P, C> {
    validator: &'a RegistrationValidator<P, C>,
    credential: &'a CreatedPublicKeyCredential,
    options: &'a PublicKeyCredentialCreationOptions,
    request: &'a RequestContext,
    rp_id: &'a str,
    state: CeremonyState,
    statement: Option<AttestationStatement>,
    attested: Option<(AttestationFormat, TrustPath)>,
}

impl<P, C> Registration<'_, P, C>
where
    P: TrustAnchorProvider,
    C: Clock,
{
    fn run<R>(&mut self, step: RegistrationStep, repository: &R) -> Result<(), CeremonyError>
    where
        R: CredentialSourceRepository + ?Sized,
    {
        let response = &self.credential.response;
        match step {
            RegistrationStep::ParseClientData => {
                self.state.parse_client_data(&response.client_data_json)
            }
            RegistrationStep::VerifyType => {
                pipeline::verify_type(self.state.client_data()?, ClientDataType::Create)
            }
            RegistrationStep::VerifyChallenge => {
                pipeline::verify_challenge(self.state.client_data()?, &self.options.challenge)
            }
            RegistrationStep::VerifyOrigin => self
                .validator
                .origins
                .assert_origin(&self.state.client_data()?.origin, self.rp_id),
            RegistrationStep::VerifyTokenBinding => self.validator.token_binding.check(
                self.state.client_data()?.token_binding.as_ref(),
                self.request,
            ),
            RegistrationStep::RequireTokenBinding => {
                token_binding::require_present(self.state.client_data()?.token_binding.as_ref())
            }
            RegistrationStep::DecodeAttestationObject => {
                let AttestationObject {
                    auth_data,
                    statement,
                } = AttestationObject::from_slice(&response.attestation_object)?;
                self.state.set_auth_data(auth_data);
                self.statement = Some(statement);
                Ok(())
            }
            RegistrationStep::VerifyRpIdHash => {
                pipeline::verify_rp_id_hash(self.state.auth_data()?, self.rp_id)
            }
            RegistrationStep::VerifyUserPresence => {
                pipeline::verify_user_presence(self.state.auth_data()?)
            }
            RegistrationStep::VerifyUserVerification => {
                pipeline::verify_user_verification(self.state.auth_data()?)
            }
            RegistrationStep::VerifyAlgorithm => self.verify_algorithm(),
            RegistrationStep::VerifyAttestationStatement => {
                let statement = self
                    .statement
                    .as_ref()
                    .ok_or_else(|| not_decoded("attestation statement"))?;
                let attested = self.validator.registry.verify(
                    statement,
                    self.state.auth_data()?,
                    self.state.client_data_hash(),
                )?;
                self.attested = Some(attested);
                Ok(())
            }
            RegistrationStep::EvaluateTrustPath => {
                let (format, trust_path) = self
                    .attested
                    .as_ref()
                    .ok_or_else(|| not_decoded("attestation"))?;
                let trusted = self.validator.evaluator.evaluate(
                    trust_path,
                    &self.attested_credential()?.aaguid,
                    self.validator.policy.enforce_metadata,
                )?;
                log::debug!("{format} attestation trust: {trusted:?}");
                Ok(())
            }
            RegistrationStep::VerifyExtensions => {
                let requested = &self.options.extensions;
                self.validator.extensions.check(
                    requested,
                    self.state.auth_data()?.extensions(),
                    Ceremony::Registration,
                )?;
                self.validator
                    .extensions
                    .check_client_outputs(requested, &self.credential.client_extension_results)
            }
            RegistrationStep::VerifyCredentialIsNew => {
                let credential_id = self.attested_credential()?.credential_id();
                match repository.find_by_credential_id(credential_id)? {
                    Some(_) => Err(CeremonyError::CredentialAlreadyRegistered),
                    None => Ok(()),
                }
            }
        }
    }

    fn attested_credential(&self) -> Result<&AttestedCredentialData, CeremonyError> {
        self.state
            .auth_data()?
            .attested_credential_data()
            .ok_or_else(|| {
                CeremonyError::MalformedInput("registration without attested credential".into())
            })
    }

    fn verify_algorithm(&self) -> Result<(), CeremonyError> {
        let alg = self.attested_credential()?.credential_public_key().algorithm();
        let requested = &self.options.pub_key_cred_params;
        let allowed = if requested.is_empty() {
            PublicKeyCredentialParameters::default_algorithms()
        } else {
            requested.clone()
        };
        if allowed
            .iter()
            .any(|param| param.ty == PublicKeyCredentialType::PublicKey && param.alg == alg)
        {
            Ok(())
        } else {
            Err(CeremonyError::AlgorithmNotAllowed(alg.to_i64()))
        }
    }

    fn into_source(self) -> Result<PublicKeyCredentialSource, CeremonyError> {
        let acd = self.attested_credential()?;
        let auth_data = self.state.auth_data()?;
        let flags = auth_data.flags();
        let (attestation_format, trust_path) = self
            .attested
            .clone()
            .ok_or_else(|| not_decoded("attestation"))?;

        Ok(PublicKeyCredentialSource {
            credential_id: acd.credential_id().into(),
            ty: PublicKeyCredentialType::PublicKey,
            transports: self.credential.response.transports.clone(),
            attestation_format,
            trust_path,
            aaguid: acd.aaguid,
            credential_public_key: acd.public_key_bytes().into(),
            user_handle: self.options.user.id.clone(),
            sign_count: auth_data.sign_count(),
            backup_eligible: flags.backup_eligible(),
            backup_state: flags.backed_up(),
            uv_initialized: flags.user_verified(),
        })
    }
}

#[cfg(test)]
mod tests;
