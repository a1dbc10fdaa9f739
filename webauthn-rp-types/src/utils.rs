pub(crate) mod bytes;
pub(crate) mod cbor;
pub(crate) mod serde;

pub mod crypto;
pub mod encoding;
