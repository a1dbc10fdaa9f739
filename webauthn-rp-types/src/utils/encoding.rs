//! Encoding helpers for the base64 flavours found in WebAuthn payloads.
//!
//! Browsers emit unpadded base64url, attestation formats like SafetyNet embed standard base64
//! and metadata statements mix both, so decoding is lenient about padding.

use data_encoding::{Specification, BASE64, BASE64URL, BASE64URL_NOPAD, BASE64_NOPAD};

/// Convert bytes to base64 without padding
pub fn base64(data: &[u8]) -> String {
    BASE64_NOPAD.encode(data)
}

/// Convert bytes to padded base64
pub fn base64_padded(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Convert bytes to base64url without padding
pub fn base64url(data: &[u8]) -> String {
    BASE64URL_NOPAD.encode(data)
}

/// Try parsing from base64 with or without padding
pub fn try_from_base64(input: &str) -> Option<Vec<u8>> {
    let sane_string = input.trim_end_matches('=');
    BASE64_NOPAD.decode(sane_string.as_bytes()).ok()
}

/// Try parsing from base64url with or without padding
pub fn try_from_base64url(input: &str) -> Option<Vec<u8>> {
    let mut specs: Specification = BASE64URL.specification();
    specs.check_trailing_bits = false;
    specs.padding = None;
    let encoding = specs.encoding().ok()?;
    let sane_string = input.trim_end_matches('=');
    encoding.decode(sane_string.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_accepts_padding_and_no_padding() {
        assert_eq!(try_from_base64url("AAEC"), Some(vec![0, 1, 2]));
        assert_eq!(try_from_base64url("AAE="), Some(vec![0, 1]));
        assert_eq!(try_from_base64url("AAE"), Some(vec![0, 1]));
    }

    #[test]
    fn base64_rejects_url_alphabet() {
        assert_eq!(try_from_base64("+/8="), Some(vec![0xfb, 0xff]));
        assert_eq!(try_from_base64("-_8"), None);
    }
}
