//! # Software Providers
//!
//! Pure-Rust [`Provider`](super::Provider) implementations registered by
//! [`ProviderRegistry::with_defaults`](super::ProviderRegistry::with_defaults).
//! Key handles are the JWKs themselves, so every key is held in process
//! memory.
//!
//! | Provider | Algorithms | Crate |
//! |----------|------------|-------|
//! | [`EcdsaProvider`] | ES256K | k256 |
//! | [`EddsaProvider`] | EdDSA (Ed25519) | ed25519-dalek |
//! | [`RsaProvider`] | RS256/384/512, PS256, RSA-OAEP, RSA-OAEP-256 | rsa |
//! | [`HmacProvider`] | HS256/384/512 | hmac, sha2 |
//! | [`DigestProvider`] | SHA-256/384/512 | sha2 |
//! | [`EcdhProvider`] | ECDH-ES (secp256k1, X25519) | k256, x25519-dalek |
//! | [`AesProvider`] | A128GCM, A256GCM, A128KW, A256KW | aes-gcm, aes-kw |
//! | [`Pbes2Provider`] | PBES2-HS256+A128KW, PBES2-HS512+A256KW | pbkdf2, aes-kw |

mod aes;
mod digest;
mod ecdh;
mod ecdsa;
mod eddsa;
mod hmac;
mod pbes2;
mod rsa;

pub use self::aes::AesProvider;
pub use self::digest::DigestProvider;
pub use self::ecdh::EcdhProvider;
pub use self::ecdsa::EcdsaProvider;
pub use self::eddsa::EddsaProvider;
pub use self::hmac::HmacProvider;
pub use self::pbes2::Pbes2Provider;
pub use self::rsa::RsaProvider;

pub(crate) use self::ecdsa::secp256k1_private_jwk;
pub(crate) use self::rsa::rsa_private_jwk;

use crate::error::{Error, Result};

/// Size of a secp256k1 field element / scalar
const SECP256K1_FIELD_SIZE: usize = 32;

/// Copy a slice into a fixed-size array
fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        Error::InvalidKey(format!("{} must be {} bytes, got {}", what, N, bytes.len()))
    })
}

/// SEC1 uncompressed point `0x04 || x || y`, left-padding short coordinates
fn sec1_uncompressed(x: &[u8], y: &[u8]) -> Result<Vec<u8>> {
    if x.len() > SECP256K1_FIELD_SIZE || y.len() > SECP256K1_FIELD_SIZE {
        return Err(Error::InvalidKey("secp256k1 coordinate too long".into()));
    }
    let mut point = Vec::with_capacity(1 + 2 * SECP256K1_FIELD_SIZE);
    point.push(0x04);
    for coordinate in [x, y] {
        point.extend(std::iter::repeat(0u8).take(SECP256K1_FIELD_SIZE - coordinate.len()));
        point.extend_from_slice(coordinate);
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sec1_left_pads() {
        let point = sec1_uncompressed(&[1], &[2; 32]).unwrap();
        assert_eq!(point.len(), 65);
        assert_eq!(point[0], 0x04);
        assert_eq!(point[32], 1);
        assert!(point[1..32].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_fixed_length_checked() {
        assert!(fixed::<32>(&[0; 31], "key").is_err());
        assert_eq!(fixed::<2>(&[7, 8], "key").unwrap(), [7, 8]);
    }
}
