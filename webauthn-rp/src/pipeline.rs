//! The ordered checks of a ceremony.
//!
//! A [`Pipeline`] is a list of steps, built per ceremony from the relying party policy and the
//! ceremony options. Running it executes the steps in order and stops at the first failure, so a
//! response is either accepted by every step or rejected with the error of exactly one.

use std::fmt;

use webauthn_rp_types::{
    authenticator::AuthenticatorData,
    crypto::sha256,
    webauthn::{ClientDataType, CollectedClientData},
};

use crate::{CeremonyError, RequestContext};

/// An ordered list of ceremony steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline<S> {
    steps: Vec<S>,
}

impl<S> Pipeline<S>
where
    S: Copy + PartialEq + fmt::Display,
{
    /// A pipeline running `steps` in the given order.
    pub fn new(steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    /// Whether `step` is part of this pipeline.
    pub fn contains(&self, step: S) -> bool {
        self.steps.contains(&step)
    }

    /// Run every step through `run_step`, stopping at the first failure.
    pub(crate) fn run(
        &self,
        mut run_step: impl FnMut(S) -> Result<(), CeremonyError>,
    ) -> Result<(), CeremonyError> {
        for step in self.steps.iter().copied() {
            log::debug!("ceremony step: {step}");
            if let Err(e) = run_step(step) {
                log::warn!("ceremony failed at {step}: {e}");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// What the steps shared by both ceremonies decode.
#[derive(Debug, Default)]
pub(crate) struct CeremonyState {
    client_data: Option<CollectedClientData>,
    client_data_hash: [u8; 32],
    auth_data: Option<AuthenticatorData>,
}

impl CeremonyState {
    pub(crate) fn parse_client_data(
        &mut self,
        client_data_json: &[u8],
    ) -> Result<(), CeremonyError> {
        let client_data = CollectedClientData::from_json(client_data_json)?;
        log::trace!("client data of {} bytes", client_data_json.len());
        self.client_data_hash = sha256(client_data_json);
        self.client_data = Some(client_data);
        Ok(())
    }

    pub(crate) fn client_data(&self) -> Result<&CollectedClientData, CeremonyError> {
        self.client_data
            .as_ref()
            .ok_or_else(|| not_decoded("client data"))
    }

    /// SHA-256 of the exact client data bytes.
    pub(crate) fn client_data_hash(&self) -> &[u8; 32] {
        &self.client_data_hash
    }

    pub(crate) fn set_auth_data(&mut self, auth_data: AuthenticatorData) {
        log::trace!(
            "authenticator data of {} bytes, flags {:?}",
            auth_data.raw().len(),
            auth_data.flags()
        );
        self.auth_data = Some(auth_data);
    }

    pub(crate) fn auth_data(&self) -> Result<&AuthenticatorData, CeremonyError> {
        self.auth_data
            .as_ref()
            .ok_or_else(|| not_decoded("authenticator data"))
    }
}

/// A step ran before the step decoding what it needs.
pub(crate) fn not_decoded(what: &str) -> CeremonyError {
    CeremonyError::MalformedInput(format!("{what} is not decoded yet"))
}

/// The RP ID of the ceremony options, or the request host when the options carry none.
pub(crate) fn relying_party_id<'a>(
    configured: Option<&'a str>,
    request: &'a RequestContext,
) -> Result<&'a str, CeremonyError> {
    configured
        .or(request.host.as_deref())
        .ok_or_else(|| CeremonyError::MalformedInput("no relying party ID".into()))
}

pub(crate) fn verify_type(
    client_data: &CollectedClientData,
    expected: ClientDataType,
) -> Result<(), CeremonyError> {
    if client_data.ty == expected {
        Ok(())
    } else {
        Err(CeremonyError::TypeMismatch)
    }
}

pub(crate) fn verify_challenge(
    client_data: &CollectedClientData,
    expected: &[u8],
) -> Result<(), CeremonyError> {
    match client_data.challenge_bytes() {
        Some(challenge) if challenge == expected => Ok(()),
        _ => Err(CeremonyError::ChallengeMismatch),
    }
}

pub(crate) fn verify_rp_id_hash(
    auth_data: &AuthenticatorData,
    rp_id: &str,
) -> Result<(), CeremonyError> {
    if *auth_data.rp_id_hash() == sha256(rp_id.as_bytes()) {
        Ok(())
    } else {
        Err(CeremonyError::RpIdMismatch)
    }
}

pub(crate) fn verify_user_presence(auth_data: &AuthenticatorData) -> Result<(), CeremonyError> {
    if auth_data.flags().user_present() {
        Ok(())
    } else {
        Err(CeremonyError::UserPresenceRequired)
    }
}

pub(crate) fn verify_user_verification(auth_data: &AuthenticatorData) -> Result<(), CeremonyError> {
    if auth_data.flags().user_verified() {
        Ok(())
    } else {
        Err(CeremonyError::UserVerificationRequired)
    }
}

#[cfg(test)]
mod tests {
    use webauthn_rp_types::authenticator::Flags;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        First,
        Second,
        Third,
    }

    impl fmt::Display for Step {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    #[test]
    fn runs_steps_in_order() {
        let pipeline = Pipeline::new([Step::First, Step::Second, Step::Third]);
        let mut ran = Vec::new();
        pipeline
            .run(|step| {
                ran.push(step);
                Ok(())
            })
            .expect("every step succeeds");
        assert_eq!(ran, pipeline.steps());
    }

    #[test]
    fn stops_at_the_first_failure() {
        let pipeline = Pipeline::new([Step::First, Step::Second, Step::Third]);
        let mut ran = Vec::new();
        let err = pipeline
            .run(|step| {
                ran.push(step);
                match step {
                    Step::Second => Err(CeremonyError::ChallengeMismatch),
                    _ => Ok(()),
                }
            })
            .expect_err("second step fails");
        assert_eq!(err, CeremonyError::ChallengeMismatch);
        assert_eq!(ran, [Step::First, Step::Second]);
        assert!(pipeline.contains(Step::Third));
    }

    fn client_data(json: &str) -> CollectedClientData {
        CollectedClientData::from_json(json.as_bytes()).expect("valid client data")
    }

    #[test]
    fn client_data_checks() {
        let data = client_data(
            r#"{"type":"webauthn.get","challenge":"AAEC","origin":"https://example.com"}"#,
        );
        assert_eq!(verify_type(&data, ClientDataType::Get), Ok(()));
        assert_eq!(
            verify_type(&data, ClientDataType::Create),
            Err(CeremonyError::TypeMismatch)
        );
        assert_eq!(verify_challenge(&data, &[0, 1, 2]), Ok(()));
        assert_eq!(
            verify_challenge(&data, &[0, 1, 3]),
            Err(CeremonyError::ChallengeMismatch)
        );

        let unknown = client_data(
            r#"{"type":"payment.other","challenge":"!!","origin":"https://example.com"}"#,
        );
        assert_eq!(
            verify_type(&unknown, ClientDataType::Create),
            Err(CeremonyError::TypeMismatch)
        );
        assert_eq!(
            verify_challenge(&unknown, &[]),
            Err(CeremonyError::ChallengeMismatch)
        );
    }

    #[test]
    fn authenticator_data_checks() {
        let data = AuthenticatorData::new("example.com", 1);
        assert_eq!(verify_rp_id_hash(&data, "example.com"), Ok(()));
        assert_eq!(
            verify_rp_id_hash(&data, "example.org"),
            Err(CeremonyError::RpIdMismatch)
        );
        assert_eq!(verify_user_presence(&data), Ok(()));
        assert_eq!(
            verify_user_verification(&data),
            Err(CeremonyError::UserVerificationRequired)
        );

        let silent = data.set_flags(Flags::UV);
        assert_eq!(
            verify_user_presence(&silent),
            Err(CeremonyError::UserPresenceRequired)
        );
        assert_eq!(verify_user_verification(&silent), Ok(()));
    }

    #[test]
    fn state_requires_decoding_first() {
        let mut state = CeremonyState::default();
        assert!(matches!(
            state.client_data(),
            Err(CeremonyError::MalformedInput(_))
        ));
        assert!(matches!(
            state.parse_client_data(b"{not json"),
            Err(CeremonyError::MalformedInput(_))
        ));

        let json = br#"{"type":"webauthn.create","challenge":"AAEC","origin":"https://example.com"}"#;
        state.parse_client_data(json).expect("valid client data");
        assert_eq!(state.client_data_hash(), &sha256(json));
        assert!(state.auth_data().is_err());
    }

    #[test]
    fn rp_id_falls_back_to_the_request_host() {
        let request = RequestContext::new("example.com");
        assert_eq!(relying_party_id(Some("login.example.com"), &request), Ok("login.example.com"));
        assert_eq!(relying_party_id(None, &request), Ok("example.com"));
        assert!(relying_party_id(None, &RequestContext::default()).is_err());
    }
}
