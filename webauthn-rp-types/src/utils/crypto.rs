//! Digest helpers shared by the decoder and the verifiers.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 of the given `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute the SHA-256 over the concatenation of every slice in `parts`.
///
/// Signed payloads are almost always `authenticatorData || clientDataHash`, this avoids
/// allocating the concatenation just to hash it.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    parts
        .iter()
        .fold(Sha256::new(), |hasher, part| hasher.chain_update(part))
        .finalize()
        .into()
}
