//! Base64url helpers shared by the JWK model and the JOSE codecs.
//!
//! Every binary field in JOSE is base64url without padding. Decoding is
//! strict (no padding, no stray trailing bits) so that re-encoding a parsed
//! value always reproduces the exact input, which signature checks rely on.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::Result;

/// Encode bytes as base64url without padding
pub fn b64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url (no padding) string
pub fn b64url_decode(text: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_without_padding() {
        let encoded = b64url_encode(b"persona");
        assert!(!encoded.contains('='));
        assert_eq!(b64url_decode(&encoded).unwrap(), b"persona");
    }

    #[test]
    fn test_padded_input_rejected() {
        assert!(b64url_decode("cGVyc29uYQ==").is_err());
    }
}
