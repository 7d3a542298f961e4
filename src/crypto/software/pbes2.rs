//! PBES2 password-based key wrap (RFC 7518 §4.8).
//!
//! The key-encryption key is `PBKDF2(password, UTF8(alg) ‖ 0x00 ‖ p2s, p2c)`
//! and the CEK is wrapped with AES-KW under it. The password travels as an
//! `oct` key whose `k` is the raw password bytes.

use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use super::aes::{key_unwrap, key_wrap};
use crate::crypto::algorithm::{names, params, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, Provider};
use crate::encoding::b64url_decode;
use crate::error::{Error, Result};
use crate::keys::{KeyOperation, SecretKey};

/// PBES2-HS256+A128KW and PBES2-HS512+A256KW
#[derive(Debug, Default, Clone, Copy)]
pub struct Pbes2Provider;

impl Pbes2Provider {
    /// Lowest accepted iteration count (RFC 7518 §4.8.1.2)
    pub const MIN_ITERATIONS: u32 = 1000;
}

/// Derive the key-encryption key from the password and the header parameters
fn derive_kek(algorithm: &Algorithm, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let p2s = algorithm
        .param_str(params::SALT)
        .ok_or_else(|| Error::InvalidKey(format!("{} requires p2s", algorithm.name)))?;
    let iterations = algorithm
        .param_u64(params::ITERATIONS)
        .ok_or_else(|| Error::InvalidKey(format!("{} requires p2c", algorithm.name)))?;
    let iterations = u32::try_from(iterations)
        .map_err(|_| Error::InvalidKey(format!("p2c out of range: {}", iterations)))?;
    if iterations < Pbes2Provider::MIN_ITERATIONS {
        return Err(Error::InvalidKey(format!(
            "p2c must be at least {}, got {}",
            Pbes2Provider::MIN_ITERATIONS,
            iterations
        )));
    }

    let mut salt = algorithm.name.as_bytes().to_vec();
    salt.push(0x00);
    salt.extend_from_slice(&b64url_decode(p2s)?);

    let kek = if algorithm.is(names::PBES2_HS256_A128KW) {
        let mut kek = Zeroizing::new(vec![0u8; 16]);
        pbkdf2_hmac::<Sha256>(password, &salt, iterations, &mut kek);
        kek
    } else if algorithm.is(names::PBES2_HS512_A256KW) {
        let mut kek = Zeroizing::new(vec![0u8; 32]);
        pbkdf2_hmac::<Sha512>(password, &salt, iterations, &mut kek);
        kek
    } else {
        return Err(Error::UnsupportedOperation(format!(
            "PBES2 algorithm {}",
            algorithm.name
        )));
    };
    Ok(kek)
}

impl Provider for Pbes2Provider {
    fn name(&self) -> &str {
        "software-pbes2"
    }

    fn encrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let password = SecretKey::from_jwk(require_kind(key, CryptoKeyKind::Secret, KeyOperation::WrapKey)?)?;
        let kek = derive_kek(algorithm, password.k.as_bytes())?;
        key_wrap(&kek, data)
    }

    fn decrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let password = SecretKey::from_jwk(require_kind(key, CryptoKeyKind::Secret, KeyOperation::UnwrapKey)?)?;
        let kek = derive_kek(algorithm, password.k.as_bytes())?;
        key_unwrap(&kek, data)
    }
}
