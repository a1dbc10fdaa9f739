use std::{fmt, sync::Arc};

use coset::iana;
use serde::{Deserialize, Serialize};
use webauthn_rp_types::{
    authenticator::{AttestationStatement, AuthenticatorData},
    crypto::sha256_concat,
    encoding::{try_from_base64, try_from_base64url},
    trust::TrustPath,
    webauthn::AttestationFormat,
    Bytes,
};

use super::{bytes, text, AttestationStatementVerifier};
use crate::{
    clock::{unix_millis, Clock, SystemClock},
    x509, AttestationError,
};

const ATTEST_HOSTNAME: &str = "attest.android.com";

/// How fresh a SafetyNet response must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafetyNetPolicy {
    /// Oldest acceptable response, in milliseconds before now.
    pub max_age_ms: u64,
    /// How far in the future a response timestamp may be, to absorb clock skew.
    pub leeway_ms: u64,
}

impl Default for SafetyNetPolicy {
    fn default() -> Self {
        Self {
            max_age_ms: 60_000,
            leeway_ms: 0,
        }
    }
}

/// The `android-safetynet` format: a SafetyNet attestation JWS whose nonce binds the
/// authenticator data and client data.
#[derive(Clone)]
pub struct AndroidSafetyNetAttestation {
    policy: SafetyNetPolicy,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AndroidSafetyNetAttestation {
    /// A verifier checking freshness against `clock`.
    pub fn new(policy: SafetyNetPolicy, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            policy,
            clock: Arc::new(clock),
        }
    }

    /// The freshness policy in use.
    pub fn policy(&self) -> SafetyNetPolicy {
        self.policy
    }
}

impl Default for AndroidSafetyNetAttestation {
    fn default() -> Self {
        Self::new(SafetyNetPolicy::default(), SystemClock)
    }
}

impl fmt::Debug for AndroidSafetyNetAttestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidSafetyNetAttestation")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    x5c: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetResponse {
    nonce: String,
    timestamp_ms: i64,
    cts_profile_match: bool,
}

impl AttestationStatementVerifier for AndroidSafetyNetAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AndroidSafetynet
    }

    fn verify(
        &self,
        statement: &AttestationStatement,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8; 32],
    ) -> Result<TrustPath, AttestationError> {
        let ver = text(statement, "ver")?;
        let response = bytes(statement, "response")?;
        if ver.is_empty() {
            return Err(AttestationError::InvalidField("ver"));
        }

        let invalid = || AttestationError::InvalidField("response");
        let jws = std::str::from_utf8(response).map_err(|_| invalid())?;
        let mut parts = jws.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let header: JwsHeader = try_from_base64url(header_b64)
            .and_then(|json| serde_json::from_slice(&json).ok())
            .ok_or_else(invalid)?;
        let payload: SafetyNetResponse = try_from_base64url(payload_b64)
            .and_then(|json| serde_json::from_slice(&json).ok())
            .ok_or_else(invalid)?;
        let signature = try_from_base64url(signature_b64).ok_or_else(invalid)?;
        let x5c = header
            .x5c
            .iter()
            .map(|cert| try_from_base64(cert).map(Bytes::from))
            .collect::<Option<Vec<_>>>()
            .filter(|x5c| !x5c.is_empty())
            .ok_or_else(invalid)?;
        let alg = match header.alg.as_str() {
            "RS256" => iana::Algorithm::RS256,
            "RS384" => iana::Algorithm::RS384,
            "RS512" => iana::Algorithm::RS512,
            "PS256" => iana::Algorithm::PS256,
            "PS384" => iana::Algorithm::PS384,
            "PS512" => iana::Algorithm::PS512,
            other => {
                log::debug!("unsupported SafetyNet JWS algorithm {other}");
                return Err(invalid());
            }
        };

        let leaf = x509::parse(&x5c[0])?;
        let signing_input = &jws.as_bytes()[..header_b64.len() + 1 + payload_b64.len()];
        x509::public_key(&leaf)?.verify(alg, signing_input, &signature)?;

        let issued_to_attest_host = leaf
            .subject()
            .iter_common_name()
            .any(|cn| cn.as_str().ok() == Some(ATTEST_HOSTNAME));
        if !issued_to_attest_host {
            return Err(AttestationError::InvalidCertificate(format!(
                "SafetyNet response is not signed by {ATTEST_HOSTNAME}"
            )));
        }

        let expected_nonce = sha256_concat(&[auth_data.raw(), client_data_hash.as_slice()]);
        if try_from_base64(&payload.nonce).as_deref() != Some(expected_nonce.as_slice()) {
            return Err(AttestationError::InvalidField("nonce"));
        }
        if !payload.cts_profile_match {
            return Err(AttestationError::InvalidField("ctsProfileMatch"));
        }
        self.check_timestamp(payload.timestamp_ms)?;

        Ok(TrustPath::Certificate(x5c))
    }
}

impl AndroidSafetyNetAttestation {
    fn check_timestamp(&self, timestamp_ms: i64) -> Result<(), AttestationError> {
        let now = unix_millis(&self.clock.as_ref());
        let timestamp = i128::from(timestamp_ms);
        if timestamp > now + i128::from(self.policy.leeway_ms) {
            log::warn!("SafetyNet response is from the future: {timestamp_ms} > {now}");
            return Err(AttestationError::InvalidField("timestampMs"));
        }
        if now - timestamp > i128::from(self.policy.max_age_ms) {
            log::warn!("SafetyNet response is too old: issued at {timestamp_ms}, now {now}");
            return Err(AttestationError::InvalidField("timestampMs"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ciborium::value::Value;

    use super::*;
    use crate::{
        clock::FixedClock,
        formats::fixtures::{self, client_data_hash, load, with, without, NOW},
    };

    fn verifier(now: u64) -> AndroidSafetyNetAttestation {
        AndroidSafetyNetAttestation::new(
            SafetyNetPolicy::default(),
            FixedClock::from_unix_seconds(now),
        )
    }

    #[test]
    fn verifies_safetynet_attestation() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        let path = verifier(NOW)
            .verify(&object.statement, &object.auth_data, &client_data_hash())
            .expect("valid attestation");
        assert_eq!(path.kind(), "certificate");
    }

    #[test]
    fn response_too_old() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        assert_eq!(
            verifier(NOW + 120).verify(&object.statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::InvalidField("timestampMs"))
        );
    }

    #[test]
    fn response_from_the_future() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        assert_eq!(
            verifier(NOW - 60).verify(&object.statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::InvalidField("timestampMs"))
        );

        let lenient = AndroidSafetyNetAttestation::new(
            SafetyNetPolicy {
                max_age_ms: 60_000,
                leeway_ms: 120_000,
            },
            FixedClock::from_unix_seconds(NOW - 60),
        );
        assert!(lenient
            .verify(&object.statement, &object.auth_data, &client_data_hash())
            .is_ok());
    }

    #[test]
    fn nonce_binds_the_client_data() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        assert_eq!(
            verifier(NOW).verify(&object.statement, &object.auth_data, &[0; 32]),
            Err(AttestationError::InvalidField("nonce"))
        );
    }

    #[test]
    fn missing_ver() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        let statement = without(&object.statement, "ver");
        assert_eq!(
            verifier(NOW).verify(&statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::MissingField("ver"))
        );
    }

    #[test]
    fn tampered_payload() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        let Some(Value::Bytes(jws)) = object.statement.get("response") else {
            panic!("response is a byte string");
        };
        let jws = String::from_utf8(jws.clone()).unwrap();
        let mut parts: Vec<&str> = jws.split('.').collect();
        let payload = webauthn_rp_types::encoding::base64url(
            br#"{"nonce":"AAAA","timestampMs":1767225590000,"ctsProfileMatch":true}"#,
        );
        parts[1] = &payload;
        let statement = with(
            &object.statement,
            "response",
            Value::Bytes(parts.join(".").into_bytes()),
        );
        assert_eq!(
            verifier(NOW).verify(&statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::SignatureMismatch)
        );
    }

    #[test]
    fn not_a_jws() {
        let object = load(fixtures::ANDROID_SAFETYNET);
        let statement = with(
            &object.statement,
            "response",
            Value::Bytes(b"header.payload".to_vec()),
        );
        assert_eq!(
            verifier(NOW).verify(&statement, &object.auth_data, &client_data_hash()),
            Err(AttestationError::InvalidField("response"))
        );
    }
}
