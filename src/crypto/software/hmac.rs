//! HS256 / HS384 / HS512 MACs over an `oct` key.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::crypto::algorithm::{names, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, Provider};
use crate::error::{Error, Result};
use crate::keys::{KeyOperation, SecretKey};

/// HMAC signer
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacProvider;

/// Compute an HMAC tag
pub(crate) fn hmac(name: &str, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    fn tag<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <M as Mac>::new_from_slice(key)
            .map_err(|e| Error::InvalidKey(format!("HMAC key: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    match name.to_ascii_uppercase().as_str() {
        names::HS256 => tag::<Hmac<Sha256>>(key, data),
        names::HS384 => tag::<Hmac<Sha384>>(key, data),
        names::HS512 => tag::<Hmac<Sha512>>(key, data),
        _ => Err(Error::UnsupportedOperation(format!("MAC algorithm {}", name))),
    }
}

fn secret(key: &CryptoKey, usage: KeyOperation) -> Result<SecretKey> {
    SecretKey::from_jwk(require_kind(key, CryptoKeyKind::Secret, usage)?)
}

impl Provider for HmacProvider {
    fn name(&self) -> &str {
        "software-hmac"
    }

    fn sign(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let secret = secret(key, KeyOperation::Sign)?;
        hmac(&algorithm.name, secret.k.as_bytes(), data)
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let secret = secret(key, KeyOperation::Verify)?;
        let key = secret.k.as_bytes();

        // constant-time comparison through `verify_slice`
        let verified = match algorithm.name.to_ascii_uppercase().as_str() {
            names::HS256 => verify_tag::<Hmac<Sha256>>(key, data, signature)?,
            names::HS384 => verify_tag::<Hmac<Sha384>>(key, data, signature)?,
            names::HS512 => verify_tag::<Hmac<Sha512>>(key, data, signature)?,
            _ => {
                return Err(Error::UnsupportedOperation(format!(
                    "MAC algorithm {}",
                    algorithm.name
                )))
            }
        };
        Ok(verified)
    }
}

fn verify_tag<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| Error::InvalidKey(format!("HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_key(bytes: &[u8]) -> CryptoKey {
        let jwk = SecretKey::from_bytes(bytes.to_vec()).to_jwk();
        CryptoKey::new(jwk, Algorithm::new("HS256"), false, &[])
    }

    #[test]
    fn test_rfc4231_case_2() {
        // RFC 4231 test case 2
        let tag = hmac("HS256", b"Jefe", b"what do ya want for nothing?").unwrap();
        let hex: String = tag.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(
            hex,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_tag_lengths() {
        assert_eq!(hmac("HS256", b"k", b"m").unwrap().len(), 32);
        assert_eq!(hmac("HS384", b"k", b"m").unwrap().len(), 48);
        assert_eq!(hmac("hs512", b"k", b"m").unwrap().len(), 64);
        assert!(hmac("HS1", b"k", b"m").is_err());
    }

    #[test]
    fn test_sign_verify() {
        let key = secret_key(b"shared secret");
        let alg = Algorithm::new("HS512");

        let tag = HmacProvider.sign(&alg, &key, b"data").unwrap();
        assert!(HmacProvider.verify(&alg, &key, b"data", &tag).unwrap());
        assert!(!HmacProvider.verify(&alg, &key, b"date", &tag).unwrap());
        assert!(!HmacProvider.verify(&alg, &key, b"data", &tag[..10]).unwrap());
    }
}
