use serde::{Deserialize, Serialize};
use webauthn_rp_attestation::SafetyNetPolicy;

/// Relying party configuration shared by both ceremonies.
///
/// `enforce_metadata` has no default: whether self attestation and authenticators without known
/// anchors are accepted is a deployment decision, so it must be stated explicitly, in code with
/// [`RelyingPartyPolicy::new`] or in the deserialized configuration.
///
/// ```
/// # use webauthn_rp::RelyingPartyPolicy;
/// let policy: RelyingPartyPolicy = serde_json::from_str(
///     r#"{"enforceMetadata":false,"allowedOrigins":["https://login.example.com"]}"#,
/// )
/// .unwrap();
/// assert!(!policy.enforce_metadata);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelyingPartyPolicy {
    /// Require attestations to lead to a trust anchor. Self attestation, `none` attestation and
    /// authenticators without known anchors are rejected when set.
    pub enforce_metadata: bool,

    /// Origins accepted verbatim. When empty, an origin is accepted when its host is the RP ID or
    /// one of its subdomains.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// RP IDs whose origins may use plain `http`, typically development hosts.
    #[serde(default)]
    pub secured_relying_party_ids: Vec<String>,

    /// Accept `localhost` origins over any scheme.
    #[serde(default)]
    pub allows_insecure_localhost: bool,

    /// RP IDs whose ceremonies fail unless the client reports a token binding.
    #[serde(default)]
    pub require_token_binding_for: Vec<String>,

    /// Freshness of `android-safetynet` attestations.
    #[serde(default)]
    pub safetynet: SafetyNetPolicy,
}

impl RelyingPartyPolicy {
    /// A policy accepting `https` origins on the RP ID and its subdomains.
    pub fn new(enforce_metadata: bool) -> Self {
        Self {
            enforce_metadata,
            allowed_origins: Vec::new(),
            secured_relying_party_ids: Vec::new(),
            allows_insecure_localhost: false,
            require_token_binding_for: Vec::new(),
            safetynet: SafetyNetPolicy::default(),
        }
    }

    /// Only accept these exact origins.
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Let these RP IDs be served over plain `http`.
    pub fn with_secured_relying_party_ids<I, S>(mut self, rp_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secured_relying_party_ids = rp_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Allow `localhost` origins.
    pub fn allows_insecure_localhost(mut self, is_allowed: bool) -> Self {
        self.allows_insecure_localhost = is_allowed;
        self
    }

    /// Require a token binding for these RP IDs.
    pub fn with_token_binding_required_for<I, S>(mut self, rp_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_token_binding_for = rp_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set how fresh SafetyNet attestations must be.
    pub fn with_safetynet_policy(mut self, safetynet: SafetyNetPolicy) -> Self {
        self.safetynet = safetynet;
        self
    }

    /// Whether ceremonies for `rp_id` require a token binding.
    pub fn requires_token_binding(&self, rp_id: &str) -> bool {
        self.require_token_binding_for.iter().any(|id| id == rp_id)
    }
}
