//! secp256k1 pairwise keys: the pairwise seed is the private scalar.

use crate::crypto::software::secp256k1_private_jwk;
use crate::error::{Error, Result};
use crate::keys::Jwk;

/// Private JWK with `d = seed`, labelled with the caller's curve name
///
/// Fails for the (negligible) seeds that are zero or not below the group
/// order.
pub(super) fn private_jwk(seed: &[u8], curve: &str) -> Result<Jwk> {
    let secret = k256::SecretKey::from_slice(seed)
        .map_err(|_| Error::KeyDerivationFailed("Pairwise seed is not a valid secp256k1 scalar".into()))?;
    let mut jwk = secp256k1_private_jwk(&secret);
    jwk.crv = Some(curve.to_string());
    Ok(jwk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::b64url_encode;

    #[test]
    fn test_scalar_is_seed() {
        let seed = [0x11u8; 32];
        let jwk = private_jwk(&seed, "secp256k1").unwrap();
        assert_eq!(jwk.d, Some(b64url_encode(seed)));
        assert!(jwk.x.is_some() && jwk.y.is_some());
    }

    #[test]
    fn test_zero_seed_rejected() {
        assert!(matches!(
            private_jwk(&[0u8; 32], "secp256k1"),
            Err(Error::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn test_order_rejected() {
        // the group order n itself
        let n = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C,
            0xD0, 0x36, 0x41, 0x41,
        ];
        assert!(private_jwk(&n, "K-256").is_err());
    }
}
