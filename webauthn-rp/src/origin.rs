use url::{Host, Url};

use crate::{CeremonyError, RelyingPartyPolicy};

/// Verifies that the origin a client reports in the client data may act for an RP ID.
///
/// Without an explicit origin list the origin's host must be the RP ID or one of its
/// subdomains, and the origin must use `https` unless the RP ID is listed as secured.
#[derive(Debug, Clone, Default)]
pub struct OriginVerifier {
    allowed_origins: Vec<String>,
    secured_relying_party_ids: Vec<String>,
    allows_insecure_localhost: bool,
}

impl OriginVerifier {
    /// Create a verifier matching origins against the RP ID only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only these exact origins.
    pub fn with_allowed_origins(mut self, origins: impl IntoIterator<Item = String>) -> Self {
        self.allowed_origins = origins
            .into_iter()
            .map(|origin| origin.trim_end_matches('/').to_owned())
            .collect();
        self
    }

    /// Accept plain `http` origins for these RP IDs.
    pub fn with_secured_relying_party_ids(
        mut self,
        rp_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        self.secured_relying_party_ids = rp_ids.into_iter().collect();
        self
    }

    /// Allows [`OriginVerifier::assert_origin`] to pass through `localhost` origins when the RP ID
    /// is `localhost` itself.
    pub fn allows_insecure_localhost(mut self, is_allowed: bool) -> Self {
        self.allows_insecure_localhost = is_allowed;
        self
    }

    /// Check `origin` against `rp_id`.
    ///
    /// Hosts are compared in their ASCII form, so an internationalized RP ID matches the
    /// punycode host the client reports.
    pub fn assert_origin(&self, origin: &str, rp_id: &str) -> Result<(), CeremonyError> {
        let mismatch = || CeremonyError::OriginMismatch(origin.to_owned());

        if !self.allowed_origins.is_empty() {
            let origin = origin.trim_end_matches('/');
            return if self.allowed_origins.iter().any(|allowed| allowed == origin) {
                Ok(())
            } else {
                log::warn!("origin {origin} is not in the allowed origins");
                Err(mismatch())
            };
        }

        let url = Url::parse(origin).map_err(|_| mismatch())?;
        let host = url.host_str().ok_or_else(mismatch)?;

        if rp_id == "localhost" && host == "localhost" {
            return if self.allows_insecure_localhost {
                Ok(())
            } else {
                log::warn!("localhost origin while insecure localhost is not allowed");
                Err(mismatch())
            };
        }

        let rp_host = match Host::parse(rp_id) {
            Ok(Host::Domain(domain)) => domain,
            _ => return Err(mismatch()),
        };
        let is_subdomain = host
            .strip_suffix(rp_host.as_str())
            .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('.'));
        if !is_subdomain {
            log::warn!("origin host {host} is not within RP ID {rp_id}");
            return Err(mismatch());
        }

        let secured = self.secured_relying_party_ids.iter().any(|id| id == rp_id);
        match url.scheme() {
            "https" => Ok(()),
            "http" if secured => Ok(()),
            scheme => {
                log::warn!("origin uses {scheme} for RP ID {rp_id}");
                Err(mismatch())
            }
        }
    }
}

impl From<&RelyingPartyPolicy> for OriginVerifier {
    fn from(policy: &RelyingPartyPolicy) -> Self {
        Self::new()
            .with_allowed_origins(policy.allowed_origins.iter().cloned())
            .with_secured_relying_party_ids(policy.secured_relying_party_ids.iter().cloned())
            .allows_insecure_localhost(policy.allows_insecure_localhost)
    }
}
