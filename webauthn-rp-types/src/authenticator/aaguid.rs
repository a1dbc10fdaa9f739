use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticator Attestation GUID, a 128-bit identifier for an authenticator model.
///
/// Relying parties use it to look up metadata and trust anchors for the authenticator that created
/// a credential. Authenticators performing `none` or self attestation, as well as U2F devices,
/// report the all-zero AAGUID, see [`Aaguid::is_empty`].
///
/// <https://w3c.github.io/webauthn/#aaguid>
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Aaguid(pub [u8; Self::LEN]);

impl Aaguid {
    /// Byte length of an AAGUID
    pub const LEN: usize = 16;

    /// Generate empty AAGUID
    pub const fn new_empty() -> Self {
        Self([0; Self::LEN])
    }

    /// Whether this is the all-zero AAGUID
    pub fn is_empty(&self) -> bool {
        self.0 == [0; Self::LEN]
    }
}

impl Default for Aaguid {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl From<[u8; 16]> for Aaguid {
    fn from(inner: [u8; 16]) -> Self {
        Aaguid(inner)
    }
}

impl TryFrom<&[u8]> for Aaguid {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        value.try_into().map(Aaguid)
    }
}

/// Hyphenated lowercase UUID form, the form metadata statements use as lookup keys.
impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aaguid({self})")
    }
}

impl Serialize for Aaguid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Aaguid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AaguidVisitor;
        impl<'de> serde::de::Visitor<'de> for AaguidVisitor {
            type Value = Aaguid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a byte string of {} bytes", Aaguid::LEN)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Aaguid::try_from(v).map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut buf = [0; Aaguid::LEN];
                for (i, slot) in buf.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                if seq.next_element::<u8>()?.is_some() {
                    return Err(serde::de::Error::invalid_length(Aaguid::LEN + 1, &self));
                }
                Ok(Aaguid(buf))
            }
        }
        deserializer.deserialize_bytes(AaguidVisitor)
    }
}

#[cfg(test)]
mod tests;
