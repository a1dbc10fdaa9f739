//! Trust paths produced by attestation verification and the anchor material they are evaluated
//! against.

use coset::iana;
use serde::{Deserialize, Serialize};

use crate::{utils::serde::i64_to_iana, Bytes};

/// How the attestation of a new credential can be trusted.
///
/// Attestation statement verifiers produce a trust path, the trust path evaluator decides whether
/// it leads to a known anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TrustPath {
    /// DER certificates, leaf first, optionally followed by intermediates.
    Certificate(Vec<Bytes>),
    /// The attestation was signed with an ECDAA key.
    Ecdaa(EcdaaTrustPath),
    /// The credential key signed its own attestation.
    #[serde(rename = "self")]
    SelfAttestation,
    /// No attestation was provided.
    None,
}

impl TrustPath {
    /// The attestation certificate, first element of a certificate path.
    pub fn leaf(&self) -> Option<&[u8]> {
        match self {
            Self::Certificate(chain) => chain.first().map(|c| &c[..]),
            _ => None,
        }
    }

    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Certificate(_) => "certificate",
            Self::Ecdaa(_) => "ecdaa",
            Self::SelfAttestation => "self",
            Self::None => "none",
        }
    }
}

/// What an ECDAA attestation left to check: which issuer key it claims and the signature it
/// made. Checking it needs the issuer parameters from the authenticator's metadata, see
/// [`EcdaaTrustAnchor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcdaaTrustPath {
    /// The `ecdaaKeyId` of the statement, identifying the issuer public key.
    pub key_id: Bytes,
    /// The ECDAA signature.
    pub signature: Bytes,
    /// The bytes that were signed.
    pub signed_data: Bytes,
    /// The `alg` of the statement.
    #[serde(with = "i64_to_iana")]
    pub algorithm: iana::Algorithm,
}

/// Curves an ECDAA issuer key may be defined over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
pub enum EcdaaCurve {
    /// Barreto-Naehrig curve over a 256 bit prime
    #[serde(rename = "BN_P256")]
    #[strum(serialize = "BN_P256")]
    BnP256,
    /// Barreto-Naehrig curve over a 638 bit prime
    #[serde(rename = "BN_P638")]
    #[strum(serialize = "BN_P638")]
    BnP638,
    /// ISO/IEC 15946 BN curve, 256 bits
    #[serde(rename = "BN_ISOP256")]
    #[strum(serialize = "BN_ISOP256")]
    BnIsoP256,
    /// ISO/IEC 15946 BN curve, 512 bits
    #[serde(rename = "BN_ISOP512")]
    #[strum(serialize = "BN_ISOP512")]
    BnIsoP512,
    /// Edwards curve
    #[serde(rename = "ED256")]
    #[strum(serialize = "ED256")]
    Ed256,
}

/// ECDAA issuer public key from a FIDO metadata statement.
///
/// Every field is read from the same JSON object, values are base64url.
///
/// <https://fidoalliance.org/specs/mds/fido-metadata-statement-v3.0-ps-20210518.html#ecdaatrustanchor-dictionary>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdaaTrustAnchor {
    /// Issuer public key point X
    #[serde(rename = "X")]
    pub x: Bytes,
    /// Issuer public key point Y
    #[serde(rename = "Y")]
    pub y: Bytes,
    /// Hash of the Schnorr proof commitment
    pub c: Bytes,
    /// Schnorr proof response for X
    pub sx: Bytes,
    /// Schnorr proof response for Y
    pub sy: Bytes,
    /// Curve the parameters live on
    #[serde(rename = "G1Curve")]
    pub g1_curve: EcdaaCurve,
}

/// Anchors the relying party trusts for one authenticator model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAnchors {
    /// DER encoded root (or pinned intermediate) certificates.
    #[serde(default)]
    pub root_certificates: Vec<Bytes>,
    /// ECDAA issuer keys.
    #[serde(default)]
    pub ecdaa_trust_anchors: Vec<EcdaaTrustAnchor>,
}

impl TrustAnchors {
    /// Anchors made of root certificates only.
    pub fn from_roots(roots: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            root_certificates: roots.into_iter().map(Bytes::from).collect(),
            ecdaa_trust_anchors: Vec::new(),
        }
    }

    /// Whether no anchor material is present at all.
    pub fn is_empty(&self) -> bool {
        self.root_certificates.is_empty() && self.ecdaa_trust_anchors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdaa_anchor_reads_every_field_from_the_same_map() {
        let json = r#"{
            "X": "AAEC",
            "Y": "AwQF",
            "c": "BgcI",
            "sx": "CQoL",
            "sy": "DA0O",
            "G1Curve": "BN_P256"
        }"#;
        let anchor: EcdaaTrustAnchor = serde_json::from_str(json).expect("valid anchor");
        assert_eq!(&*anchor.x, &[0, 1, 2]);
        assert_eq!(&*anchor.y, &[3, 4, 5]);
        assert_eq!(&*anchor.c, &[6, 7, 8]);
        assert_eq!(&*anchor.sx, &[9, 10, 11]);
        assert_eq!(&*anchor.sy, &[12, 13, 14]);
        assert_eq!(anchor.g1_curve, EcdaaCurve::BnP256);
    }

    #[test]
    fn ecdaa_anchor_requires_c() {
        let json = r#"{"X": "AAEC", "Y": "AwQF", "sx": "CQoL", "sy": "DA0O", "G1Curve": "ED256"}"#;
        serde_json::from_str::<EcdaaTrustAnchor>(json).expect_err("c is mandatory");
    }

    #[test]
    fn trust_path_json_shape() {
        let path = TrustPath::Certificate(vec![Bytes::from(vec![0x30, 0x00])]);
        let json = serde_json::to_value(&path).expect("serializable");
        assert_eq!(json["type"], "certificate");
        assert_eq!(path.leaf(), Some(&[0x30, 0x00][..]));

        let back: TrustPath = serde_json::from_value(json).expect("round trips");
        assert_eq!(back, path);

        let json = serde_json::to_value(TrustPath::SelfAttestation).expect("serializable");
        assert_eq!(json["type"], "self");
        assert_eq!(TrustPath::None.leaf(), None);
    }
}
