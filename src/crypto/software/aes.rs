//! AES-GCM content encryption and AES key wrap.
//!
//! ## Parameters
//!
//! | Algorithm | Key | Parameters | Output |
//! |-----------|-----|------------|--------|
//! | A128GCM / A256GCM | 16 / 32 byte `oct` | `iv` (12 bytes), `additionalData` (optional), both base64url | `ciphertext ‖ tag` |
//! | A128KW / A256KW | 16 / 32 byte `oct` | none | wrapped key (input + 8 bytes) |

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use aes_kw::{KekAes128, KekAes256};

use super::fixed;
use crate::crypto::algorithm::{names, params, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, Provider};
use crate::encoding::b64url_decode;
use crate::error::{Error, Result};
use crate::keys::{KeyOperation, SecretKey};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// AES-GCM and AES-KW
#[derive(Debug, Default, Clone, Copy)]
pub struct AesProvider;

fn secret_bytes(key: &CryptoKey, usage: KeyOperation) -> Result<SecretKey> {
    SecretKey::from_jwk(require_kind(key, CryptoKeyKind::Secret, usage)?)
}

fn gcm_parts(algorithm: &Algorithm) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let iv = algorithm
        .param_str(params::IV)
        .ok_or_else(|| Error::EncryptionFailed(format!("{} requires an iv", algorithm.name)))?;
    let iv = fixed::<NONCE_SIZE>(&b64url_decode(iv)?, "AES-GCM iv")?;
    let aad = match algorithm.param_str(params::ADDITIONAL_DATA) {
        Some(aad) => b64url_decode(aad)?,
        None => Vec::new(),
    };
    Ok((iv, aad))
}

/// AES-GCM encrypt; the key size selects AES-128 or AES-256
pub(crate) fn gcm_encrypt(key: &[u8], iv: &[u8; NONCE_SIZE], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let payload = Payload { msg: plaintext, aad };
    let nonce = Nonce::from_slice(iv);
    let ciphertext = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?
            .encrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?
            .encrypt(nonce, payload),
        other => {
            return Err(Error::EncryptionFailed(format!(
                "AES-GCM key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    ciphertext.map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))
}

/// AES-GCM decrypt of `ciphertext ‖ tag`
pub(crate) fn gcm_decrypt(key: &[u8], iv: &[u8; NONCE_SIZE], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let payload = Payload { msg: ciphertext, aad };
    let nonce = Nonce::from_slice(iv);
    let plaintext = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?
            .decrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?
            .decrypt(nonce, payload),
        other => {
            return Err(Error::DecryptionFailed(format!(
                "AES-GCM key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    plaintext.map_err(|_| {
        Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
    })
}

/// RFC 3394 key wrap
pub(crate) fn key_wrap(kek: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let wrapped = match kek.len() {
        16 => KekAes128::from(fixed::<16>(kek, "AES-KW key")?).wrap_vec(key),
        32 => KekAes256::from(fixed::<32>(kek, "AES-KW key")?).wrap_vec(key),
        other => {
            return Err(Error::EncryptionFailed(format!(
                "AES-KW key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    wrapped.map_err(|_| Error::EncryptionFailed("AES-KW wrap error".into()))
}

/// RFC 3394 key unwrap; fails on an integrity check mismatch
pub(crate) fn key_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    let unwrapped = match kek.len() {
        16 => KekAes128::from(fixed::<16>(kek, "AES-KW key")?).unwrap_vec(wrapped),
        32 => KekAes256::from(fixed::<32>(kek, "AES-KW key")?).unwrap_vec(wrapped),
        other => {
            return Err(Error::DecryptionFailed(format!(
                "AES-KW key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    unwrapped.map_err(|_| Error::DecryptionFailed("AES-KW unwrap error".into()))
}

/// Key size an algorithm requires
fn expected_key_len(algorithm: &Algorithm) -> Result<usize> {
    if algorithm.is(names::A128GCM) || algorithm.is(names::A128KW) {
        Ok(16)
    } else if algorithm.is(names::A256GCM) || algorithm.is(names::A256KW) {
        Ok(32)
    } else {
        Err(Error::UnsupportedOperation(format!(
            "AES algorithm {}",
            algorithm.name
        )))
    }
}

fn is_key_wrap(algorithm: &Algorithm) -> bool {
    algorithm.is(names::A128KW) || algorithm.is(names::A256KW)
}

fn check_len(algorithm: &Algorithm, key: &[u8]) -> Result<()> {
    let expected = expected_key_len(algorithm)?;
    if key.len() != expected {
        return Err(Error::InvalidKey(format!(
            "{} requires a {}-byte key, got {}",
            algorithm.name,
            expected,
            key.len()
        )));
    }
    Ok(())
}

impl Provider for AesProvider {
    fn name(&self) -> &str {
        "software-aes"
    }

    fn encrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        if is_key_wrap(algorithm) {
            let kek = secret_bytes(key, KeyOperation::WrapKey)?;
            check_len(algorithm, kek.k.as_bytes())?;
            return key_wrap(kek.k.as_bytes(), data);
        }

        let cek = secret_bytes(key, KeyOperation::Encrypt)?;
        check_len(algorithm, cek.k.as_bytes())?;
        let (iv, aad) = gcm_parts(algorithm)?;
        gcm_encrypt(cek.k.as_bytes(), &iv, &aad, data)
    }

    fn decrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        if is_key_wrap(algorithm) {
            let kek = secret_bytes(key, KeyOperation::UnwrapKey)?;
            check_len(algorithm, kek.k.as_bytes())?;
            return key_unwrap(kek.k.as_bytes(), data);
        }

        let cek = secret_bytes(key, KeyOperation::Decrypt)?;
        check_len(algorithm, cek.k.as_bytes())?;
        let (iv, aad) = gcm_parts(algorithm)?;
        gcm_decrypt(cek.k.as_bytes(), &iv, &aad, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::b64url_encode;

    fn secret(bytes: &[u8]) -> CryptoKey {
        CryptoKey::new(
            SecretKey::from_bytes(bytes.to_vec()).to_jwk(),
            Algorithm::new("A256GCM"),
            false,
            &[],
        )
    }

    fn gcm(name: &str, aad: &[u8]) -> Algorithm {
        Algorithm::new(name)
            .with_param(params::IV, b64url_encode([9u8; NONCE_SIZE]))
            .with_param(params::ADDITIONAL_DATA, b64url_encode(aad))
    }

    #[test]
    fn test_gcm_roundtrip() {
        let key = secret(&[1u8; 32]);
        let alg = gcm("A256GCM", b"header");

        let ciphertext = AesProvider.encrypt(&alg, &key, b"Hello, Bob!").unwrap();
        assert_eq!(ciphertext.len(), b"Hello, Bob!".len() + TAG_SIZE);

        let plaintext = AesProvider.decrypt(&alg, &key, &ciphertext).unwrap();
        assert_eq!(plaintext, b"Hello, Bob!");
    }

    #[test]
    fn test_gcm_aad_mismatch_fails() {
        let key = secret(&[1u8; 16]);
        let ciphertext = AesProvider.encrypt(&gcm("A128GCM", b"one"), &key, b"msg").unwrap();
        let err = AesProvider
            .decrypt(&gcm("A128GCM", b"two"), &key, &ciphertext)
            .unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed(_)));
    }

    #[test]
    fn test_gcm_wrong_key_size() {
        let key = secret(&[1u8; 16]);
        assert!(AesProvider.encrypt(&gcm("A256GCM", b""), &key, b"msg").is_err());
    }

    #[test]
    fn test_gcm_requires_iv() {
        let key = secret(&[1u8; 32]);
        assert!(AesProvider
            .encrypt(&Algorithm::new("A256GCM"), &key, b"msg")
            .is_err());
    }

    #[test]
    fn test_rfc3394_vector() {
        // RFC 3394 section 4.1: 128-bit KEK, 128-bit key data
        let kek: Vec<u8> = (0u8..16).collect();
        let data: Vec<u8> = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ]
        .to_vec();
        let expected = [
            0x1F, 0xA6, 0x8B, 0x0A, 0x81, 0x12, 0xB4, 0x47, 0xAE, 0xF3, 0x4B, 0xD8, 0xFB, 0x5A,
            0x7B, 0x82, 0x9D, 0x3E, 0x86, 0x23, 0x71, 0xD2, 0xCF, 0xE5,
        ];

        let wrapped = AesProvider
            .encrypt(&Algorithm::new("A128KW"), &secret(&kek), &data)
            .unwrap();
        assert_eq!(wrapped, expected);

        let unwrapped = AesProvider
            .decrypt(&Algorithm::new("A128KW"), &secret(&kek), &wrapped)
            .unwrap();
        assert_eq!(unwrapped, data);
    }

    #[test]
    fn test_unwrap_wrong_kek_fails() {
        let wrapped = key_wrap(&[1u8; 32], &[5u8; 32]).unwrap();
        assert!(key_unwrap(&[2u8; 32], &wrapped).is_err());
    }
}
