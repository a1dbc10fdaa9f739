use ciborium::value::Value;
use webauthn_rp_attestation::{
    AttestationError, FixedClock, MemoryTrustAnchorProvider, TrustError,
};
use webauthn_rp_types::{
    authenticator::Flags,
    encoding::base64url,
    trust::TrustAnchors,
    webauthn::{AuthenticatorSelectionCriteria, UserVerificationRequirement},
};

use super::*;
use crate::{
    fixtures::{self, challenge, clock, creation_options, none_registration, RP_ID},
    repository::MockCredentialSourceRepository,
    MemoryRepository, RepositoryError,
};

fn permissive() -> RegistrationValidator<MemoryTrustAnchorProvider, FixedClock> {
    RegistrationValidator::new(
        RelyingPartyPolicy::new(false),
        MemoryTrustAnchorProvider::new(),
        clock(),
    )
}

/// Registration of one of the captured attestation objects.
fn captured(attestation_object: &[u8]) -> CreatedPublicKeyCredential {
    let object = AttestationObject::from_slice(attestation_object).expect("fixture decodes");
    let credential_id = object
        .auth_data
        .attested_credential_data()
        .expect("fixture carries a credential")
        .credential_id()
        .to_vec();
    fixtures::created(
        &credential_id,
        fixtures::CLIENT_DATA.to_vec(),
        attestation_object.to_vec(),
    )
}

#[test]
fn none_attestation_is_registered() {
    let mut repository = MemoryRepository::new();
    let source = permissive()
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect("valid registration");

    assert_eq!(source.attestation_format, AttestationFormat::None);
    assert_eq!(source.trust_path, TrustPath::None);
    assert_eq!(source.credential_id.as_slice(), fixtures::CREDENTIAL_ID);
    assert_eq!(source.user_handle.as_slice(), fixtures::USER_HANDLE);
    assert_eq!(source.sign_count, 0);
    assert!(source.uv_initialized);
    assert_eq!(source.public_key(), Ok(fixtures::credential_key()));
    assert_eq!(
        repository.get(fixtures::CREDENTIAL_ID.as_slice()),
        Some(&source)
    );
}

#[test]
fn fido_u2f_without_signature_fails_before_certificates() {
    let object = AttestationObject::from_slice(fixtures::FIDO_U2F).expect("fixture decodes");
    let Value::Map(mut fields) = object.statement.to_cbor_value() else {
        unreachable!("statements are maps");
    };
    fields.retain(|(k, _)| k.as_text() != Some("sig"));
    let stripped = AttestationObject {
        statement: AttestationStatement::new("fido-u2f", Value::Map(fields))
            .expect("valid statement"),
        ..object
    };

    let mut repository = MemoryRepository::new();
    let credential = captured(&stripped.to_vec());
    let err = permissive()
        .validate_attestation(
            &credential,
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect_err("sig is required");
    assert_eq!(err, CeremonyError::MissingField("sig"));
    assert!(repository.is_empty());
}

#[test]
fn get_response_is_not_a_registration() {
    let mut credential = none_registration();
    credential.response.client_data_json =
        fixtures::client_data("webauthn.get", &challenge(), fixtures::ORIGIN).into();

    let mut repository = MockCredentialSourceRepository::new();
    repository.expect_find_by_credential_id().never();
    repository.expect_save().never();

    let err = permissive()
        .validate_attestation(
            &credential,
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect_err("type is webauthn.get");
    assert_eq!(err, CeremonyError::TypeMismatch);
}

#[test]
fn client_data_binding() {
    let validator = permissive();
    let options = creation_options(challenge());
    let cases = [
        (
            fixtures::client_data("webauthn.create", &[9; 32], fixtures::ORIGIN),
            CeremonyError::ChallengeMismatch,
        ),
        (
            fixtures::client_data("webauthn.create", &challenge(), "https://example.org"),
            CeremonyError::OriginMismatch("https://example.org".into()),
        ),
    ];

    for (client_data_json, expected) in cases {
        let mut credential = none_registration();
        credential.response.client_data_json = client_data_json.into();
        let mut repository = MemoryRepository::new();
        assert_eq!(
            validator.validate_attestation(
                &credential,
                &options,
                &RequestContext::default(),
                &mut repository
            ),
            Err(expected)
        );
        assert!(repository.is_empty());
    }

    let mut credential = none_registration();
    credential.response.client_data_json = b"{\"type\":".to_vec().into();
    assert!(matches!(
        validator.validate_attestation(
            &credential,
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::MalformedInput(_))
    ));
}

#[test]
fn authenticator_data_binding() {
    let validator = permissive();
    let options = creation_options(challenge());
    let cases = [
        (
            fixtures::attested_auth_data("example.org", Flags::UP),
            CeremonyError::RpIdMismatch,
        ),
        (
            fixtures::attested_auth_data(RP_ID, Flags::UV),
            CeremonyError::UserPresenceRequired,
        ),
    ];

    for (auth_data, expected) in cases {
        let credential = fixtures::created(
            &fixtures::CREDENTIAL_ID,
            fixtures::client_data("webauthn.create", &challenge(), fixtures::ORIGIN),
            fixtures::none_attestation_object(auth_data),
        );
        assert_eq!(
            validator.validate_attestation(
                &credential,
                &options,
                &RequestContext::default(),
                &mut MemoryRepository::new()
            ),
            Err(expected)
        );
    }
}

#[test]
fn user_verification_only_when_required() {
    let validator = permissive();
    let credential = fixtures::created(
        &fixtures::CREDENTIAL_ID,
        fixtures::client_data("webauthn.create", &challenge(), fixtures::ORIGIN),
        fixtures::none_attestation_object(fixtures::attested_auth_data(RP_ID, Flags::UP)),
    );

    let mut options = creation_options(challenge());
    assert!(validator
        .validate_attestation(
            &credential,
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        )
        .is_ok());

    options.authenticator_selection = Some(AuthenticatorSelectionCriteria {
        user_verification: UserVerificationRequirement::Required,
        ..Default::default()
    });
    assert!(validator
        .pipeline(&options, RP_ID)
        .contains(RegistrationStep::VerifyUserVerification));
    assert_eq!(
        validator.validate_attestation(
            &credential,
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::UserVerificationRequired)
    );
}

#[test]
fn algorithm_must_be_requested() {
    let mut options = creation_options(challenge());
    options.pub_key_cred_params = vec![PublicKeyCredentialParameters::public_key(
        coset::iana::Algorithm::EdDSA,
    )];
    let err = permissive()
        .validate_attestation(
            &none_registration(),
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new(),
        )
        .expect_err("ES256 was not requested");
    assert_eq!(err, CeremonyError::AlgorithmNotAllowed(-7));

    // no parameters means the defaults, which include ES256
    options.pub_key_cred_params = Vec::new();
    assert!(permissive()
        .validate_attestation(
            &none_registration(),
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new(),
        )
        .is_ok());
}

#[test]
fn credential_id_must_be_new() {
    let mut repository = MemoryRepository::new();
    repository.save(fixtures::stored_source(3)).expect("in memory");

    let err = permissive()
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect_err("already registered");
    assert_eq!(err, CeremonyError::CredentialAlreadyRegistered);
    assert_eq!(
        repository
            .get(fixtures::CREDENTIAL_ID.as_slice())
            .map(|source| source.sign_count),
        Some(3)
    );
}

#[test]
fn saved_only_after_every_check() {
    let mut repository = MockCredentialSourceRepository::new();
    repository
        .expect_find_by_credential_id()
        .once()
        .returning(|_| Ok(None));
    repository
        .expect_save()
        .once()
        .withf(|source| source.credential_id.as_slice() == fixtures::CREDENTIAL_ID)
        .returning(|_| Ok(()));

    permissive()
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect("valid registration");
}

#[test]
fn repository_failures_are_surfaced() {
    let mut repository = MockCredentialSourceRepository::new();
    repository
        .expect_find_by_credential_id()
        .returning(|_| Ok(None));
    repository
        .expect_save()
        .returning(|_| Err(RepositoryError("disk full".into())));

    let err = permissive()
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect_err("save fails");
    assert_eq!(err, CeremonyError::Repository(RepositoryError("disk full".into())));
}

#[test]
fn rp_id_defaults_to_the_request_host() {
    let mut options = creation_options(challenge());
    options.rp.id = None;

    let validator = permissive();
    assert_eq!(
        validator.validate_attestation(
            &none_registration(),
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::MalformedInput("no relying party ID".into()))
    );
    assert!(validator
        .validate_attestation(
            &none_registration(),
            &options,
            &RequestContext::new(RP_ID),
            &mut MemoryRepository::new()
        )
        .is_ok());
}

#[test]
fn enforced_metadata_rejects_none_attestation() {
    let validator = RegistrationValidator::new(
        RelyingPartyPolicy::new(true),
        MemoryTrustAnchorProvider::new(),
        clock(),
    );
    let err = validator
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut MemoryRepository::new(),
        )
        .expect_err("none is not trusted");
    assert_eq!(
        err,
        CeremonyError::AttestationNotTrusted {
            reason: TrustError::AttestationNotTrusted("none")
        }
    );
}

#[test]
fn packed_attestation_chains_to_the_root() {
    let anchors = Some(TrustAnchors::from_roots([fixtures::ROOT.to_vec()]));
    let validator = RegistrationValidator::new(RelyingPartyPolicy::new(true), anchors, clock());
    let mut repository = MemoryRepository::new();

    let source = validator
        .validate_attestation(
            &captured(fixtures::PACKED),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut repository,
        )
        .expect("anchored attestation");
    assert_eq!(source.attestation_format, AttestationFormat::Packed);
    assert!(matches!(source.trust_path, TrustPath::Certificate(_)));
    assert!(!source.aaguid.is_empty());
    assert_eq!(repository.len(), 1);
}

#[test]
fn packed_attestation_without_anchors_is_untrusted() {
    let validator = RegistrationValidator::new(
        RelyingPartyPolicy::new(true),
        None::<TrustAnchors>,
        clock(),
    );
    assert_eq!(
        validator.validate_attestation(
            &captured(fixtures::PACKED),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::AttestationNotTrusted {
            reason: TrustError::UntrustedChain
        })
    );

    // the same chain is accepted unverified when metadata is not enforced
    let validator = RegistrationValidator::new(
        RelyingPartyPolicy::new(false),
        None::<TrustAnchors>,
        clock(),
    );
    assert!(validator
        .validate_attestation(
            &captured(fixtures::PACKED),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut MemoryRepository::new()
        )
        .is_ok());
}

#[test]
fn restricted_registry_rejects_other_formats() {
    let registry = AttestationStatementRegistry::new()
        .with_verifier(webauthn_rp_attestation::formats::PackedAttestation);
    let err = permissive()
        .with_registry(registry)
        .validate_attestation(
            &none_registration(),
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut MemoryRepository::new(),
        )
        .expect_err("none is not registered");
    assert_eq!(err, CeremonyError::UnsupportedAttestationFormat("none".into()));
}

#[test]
fn tampered_client_data_breaks_the_attestation_signature() {
    let mut credential = captured(fixtures::PACKED);
    let mut client_data = fixtures::CLIENT_DATA.to_vec();
    // same values, different bytes
    client_data.push(b' ');
    credential.response.client_data_json = client_data.into();

    let err = permissive()
        .validate_attestation(
            &credential,
            &creation_options(challenge()),
            &RequestContext::default(),
            &mut MemoryRepository::new(),
        )
        .expect_err("client data hash changed");
    assert_eq!(err, CeremonyError::SignatureMismatch);
}

#[test]
fn token_binding_policy() {
    let mut credential = none_registration();
    credential.response.client_data_json = format!(
        r#"{{"type":"webauthn.create","challenge":"{}","origin":"{}","tokenBinding":{{"status":"present","id":"AAEC"}}}}"#,
        base64url(&challenge()),
        fixtures::ORIGIN
    )
    .into_bytes()
    .into();
    let options = creation_options(challenge());

    assert_eq!(
        permissive().validate_attestation(
            &credential,
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::TokenBindingMismatch)
    );

    let validator = permissive().with_token_binding_handler(token_binding::SecTokenBindingHandler);
    assert!(validator
        .validate_attestation(
            &credential,
            &options,
            &RequestContext::default().with_sec_token_binding("AAEC"),
            &mut MemoryRepository::new()
        )
        .is_ok());

    let required = RegistrationValidator::new(
        RelyingPartyPolicy::new(false).with_token_binding_required_for([RP_ID]),
        MemoryTrustAnchorProvider::new(),
        clock(),
    );
    assert!(required
        .pipeline(&options, RP_ID)
        .contains(RegistrationStep::RequireTokenBinding));
    assert_eq!(
        required.validate_attestation(
            &none_registration(),
            &options,
            &RequestContext::default(),
            &mut MemoryRepository::new()
        ),
        Err(CeremonyError::TokenBindingMismatch)
    );
}

#[test]
fn pipeline_follows_the_canonical_order() {
    let steps = permissive()
        .pipeline(&creation_options(challenge()), RP_ID)
        .steps()
        .to_vec();
    assert_eq!(
        steps,
        [
            RegistrationStep::ParseClientData,
            RegistrationStep::VerifyType,
            RegistrationStep::VerifyChallenge,
            RegistrationStep::VerifyOrigin,
            RegistrationStep::VerifyTokenBinding,
            RegistrationStep::DecodeAttestationObject,
            RegistrationStep::VerifyRpIdHash,
            RegistrationStep::VerifyUserPresence,
            RegistrationStep::VerifyAlgorithm,
            RegistrationStep::VerifyAttestationStatement,
            RegistrationStep::EvaluateTrustPath,
            RegistrationStep::VerifyExtensions,
            RegistrationStep::VerifyCredentialIsNew,
        ]
    );
}

#[test]
fn attestation_errors_keep_their_kind() {
    assert_eq!(
        CeremonyError::from(AttestationError::SignatureMismatch),
        CeremonyError::SignatureMismatch
    );
}
