//! Trust path evaluation: deciding whether an attestation leads to an anchor the relying party
//! trusts.

use std::collections::HashMap;

use webauthn_rp_types::{
    authenticator::Aaguid,
    trust::{EcdaaTrustAnchor, EcdaaTrustPath, TrustAnchors, TrustPath},
    Bytes,
};
use x509_parser::certificate::X509Certificate;

use crate::{
    clock::{self, Clock},
    x509, TrustError,
};

/// Resolves the anchors configured for an authenticator model, typically from a FIDO metadata
/// snapshot fetched out of band.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait TrustAnchorProvider {
    /// Anchors for authenticators reporting `aaguid`.
    fn find_by_aaguid(&self, aaguid: &Aaguid) -> Option<TrustAnchors>;

    /// Anchors for an attestation certificate without AAGUID, identified by the hex SHA-1 of its
    /// subject public key. This is how U2F devices are listed.
    fn find_by_key_identifier(&self, key_identifier: &str) -> Option<TrustAnchors>;
}

/// Lookup key of [`MemoryTrustAnchorProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKey {
    /// An authenticator model
    Aaguid(Aaguid),
    /// An attestation certificate key identifier
    KeyIdentifier(String),
}

/// In-memory trust anchors.
///
/// Useful for tests and deployments with a handful of known authenticator models.
pub type MemoryTrustAnchorProvider = HashMap<AnchorKey, TrustAnchors>;

impl TrustAnchorProvider for MemoryTrustAnchorProvider {
    fn find_by_aaguid(&self, aaguid: &Aaguid) -> Option<TrustAnchors> {
        self.get(&AnchorKey::Aaguid(*aaguid)).cloned()
    }

    fn find_by_key_identifier(&self, key_identifier: &str) -> Option<TrustAnchors> {
        self.get(&AnchorKey::KeyIdentifier(key_identifier.to_lowercase()))
            .cloned()
    }
}

/// The same anchors for every authenticator, or none at all.
impl TrustAnchorProvider for Option<TrustAnchors> {
    fn find_by_aaguid(&self, _aaguid: &Aaguid) -> Option<TrustAnchors> {
        self.clone()
    }

    fn find_by_key_identifier(&self, _key_identifier: &str) -> Option<TrustAnchors> {
        self.clone()
    }
}

/// Pairing based ECDAA verification.
///
/// No implementation ships with this crate. Without one every ECDAA attestation is rejected.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait EcdaaVerifier {
    /// Whether `path` carries a valid ECDAA signature under the issuer key `anchor`.
    fn verify(&self, path: &EcdaaTrustPath, anchor: &EcdaaTrustAnchor) -> bool;
}

/// Successful outcome of [`TrustPathEvaluator::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trusted {
    /// The trust path leads to a configured anchor.
    Anchored,
    /// Accepted without an anchor because metadata is not enforced: self or no attestation, or
    /// a certificate path for an authenticator no anchors are configured for.
    Unverified,
}

/// Evaluates trust paths against the anchors of a [`TrustAnchorProvider`].
///
/// Evaluation only reads the anchor set and the clock.
pub struct TrustPathEvaluator<P, C> {
    anchors: P,
    clock: C,
    ecdaa: Option<Box<dyn EcdaaVerifier>>,
}

impl<P, C> TrustPathEvaluator<P, C>
where
    P: TrustAnchorProvider,
    C: Clock,
{
    /// Create an evaluator without ECDAA support.
    pub fn new(anchors: P, clock: C) -> Self {
        Self {
            anchors,
            clock,
            ecdaa: None,
        }
    }

    /// Use `verifier` for ECDAA trust paths.
    pub fn with_ecdaa_verifier(mut self, verifier: impl EcdaaVerifier + 'static) -> Self {
        self.ecdaa = Some(Box::new(verifier));
        self
    }

    /// The clock this evaluator checks validity periods against.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Decide whether `path`, produced for an authenticator reporting `aaguid`, is trusted.
    ///
    /// With `enforce_metadata` unset, self and no attestation are accepted and so are
    /// certificate paths of authenticators no anchors are known for.
    pub fn evaluate(
        &self,
        path: &TrustPath,
        aaguid: &Aaguid,
        enforce_metadata: bool,
    ) -> Result<Trusted, TrustError> {
        log::debug!(
            "evaluating {} trust path for {aaguid}, metadata enforced: {enforce_metadata}",
            path.kind()
        );
        match path {
            TrustPath::None | TrustPath::SelfAttestation => {
                if enforce_metadata {
                    Err(TrustError::AttestationNotTrusted(path.kind()))
                } else {
                    Ok(Trusted::Unverified)
                }
            }
            TrustPath::Certificate(chain) => {
                let anchors = self.anchors_for_chain(chain, aaguid)?;
                match anchors {
                    Some(anchors) if !anchors.root_certificates.is_empty() => {
                        self.verify_chain(chain, &anchors).map(|()| Trusted::Anchored)
                    }
                    _ if enforce_metadata => Err(TrustError::UntrustedChain),
                    _ => {
                        log::debug!("no anchors known for {aaguid}, accepting unverified chain");
                        Ok(Trusted::Unverified)
                    }
                }
            }
            TrustPath::Ecdaa(ecdaa) => {
                let anchors = self.anchors.find_by_aaguid(aaguid).unwrap_or_default();
                verify_ecdaa(self.ecdaa.as_deref(), ecdaa, &anchors).map(|()| Trusted::Anchored)
            }
        }
    }

    fn anchors_for_chain(
        &self,
        chain: &[Bytes],
        aaguid: &Aaguid,
    ) -> Result<Option<TrustAnchors>, TrustError> {
        if !aaguid.is_empty() {
            return Ok(self.anchors.find_by_aaguid(aaguid));
        }
        let leaf = chain.first().ok_or(TrustError::UntrustedChain)?;
        let leaf = parse(leaf)?;
        Ok(self
            .anchors
            .find_by_key_identifier(&x509::key_identifier(&leaf)))
    }

    /// Verify a certificate path, leaf first, against root certificates.
    ///
    /// Every certificate in the path must be valid now and signed by its successor, which must be
    /// a CA whose path length constraint admits the certificates below it. The path is
    /// trusted once one of its certificates is an anchor, or when its last certificate is signed
    /// by one.
    pub fn verify_chain(&self, chain: &[Bytes], anchors: &TrustAnchors) -> Result<(), TrustError> {
        let now = clock::unix_seconds(&self.clock);
        let certs = chain
            .iter()
            .map(|der| parse(der))
            .collect::<Result<Vec<_>, _>>()?;
        if certs.is_empty() {
            return Err(TrustError::UntrustedChain);
        }

        for (position, cert) in certs.iter().enumerate() {
            if !x509::is_valid_at(cert, now) {
                log::warn!("certificate {position} of the attestation path is not valid now");
                return Err(TrustError::CertificateExpired(position));
            }
            if anchors.root_certificates.contains(&chain[position]) {
                return Ok(());
            }
            if let Some(issuer) = certs.get(position + 1) {
                if !x509::is_issued_by(cert, issuer) {
                    log::warn!("certificate {position} is not signed by its successor");
                    return Err(TrustError::ChainBroken(position));
                }
                if !x509::may_issue(issuer, position) {
                    log::warn!("issuer of certificate {position} is not a CA for this path");
                    return Err(TrustError::ChainBroken(position));
                }
            }
        }

        let last_position = certs.len() - 1;
        let last = &certs[last_position];
        let roots = anchors
            .root_certificates
            .iter()
            .map(|der| parse(der))
            .collect::<Result<Vec<_>, _>>()?;
        let mut candidates = roots
            .iter()
            .filter(|root| root.subject().as_raw() == last.issuer().as_raw())
            .peekable();
        if candidates.peek().is_none() {
            return Err(TrustError::UntrustedChain);
        }
        match candidates.find(|root| x509::is_issued_by(last, root)) {
            Some(root) if !x509::may_issue(root, last_position) => {
                log::warn!("trusted root is no CA for the attestation path");
                Err(TrustError::ChainBroken(last_position))
            }
            Some(root) if x509::is_valid_at(root, now) => Ok(()),
            Some(_) => Err(TrustError::CertificateExpired(certs.len())),
            None => {
                log::warn!("attestation path names a trusted root but is not signed by it");
                Err(TrustError::ChainBroken(last_position))
            }
        }
    }
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>, TrustError> {
    x509::parse(der).map_err(|e| TrustError::InvalidCertificate(e.to_string()))
}

fn verify_ecdaa(
    verifier: Option<&dyn EcdaaVerifier>,
    path: &EcdaaTrustPath,
    anchors: &TrustAnchors,
) -> Result<(), TrustError> {
    let Some(verifier) = verifier else {
        log::warn!("ECDAA attestation received but no ECDAA verifier is configured");
        return Err(TrustError::EcdaaVerificationFailed);
    };
    if anchors
        .ecdaa_trust_anchors
        .iter()
        .any(|anchor| verifier.verify(path, anchor))
    {
        Ok(())
    } else {
        Err(TrustError::EcdaaVerificationFailed)
    }
}
