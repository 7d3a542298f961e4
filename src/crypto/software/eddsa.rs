//! EdDSA over Ed25519.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use super::fixed;
use crate::crypto::algorithm::{curves, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, CryptoKeyPair, Provider};
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{
    Jwk, KeyOperation, KeyType, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial,
};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519 signer
#[derive(Debug, Default, Clone, Copy)]
pub struct EddsaProvider;

impl Provider for EddsaProvider {
    fn name(&self) -> &str {
        "software-eddsa"
    }

    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Result<CryptoKeyPair> {
        let signing_key = SigningKey::generate(&mut OsRng);

        let mut jwk = Jwk::new(KeyType::Okp);
        jwk.crv = Some(curves::ED25519.to_string());
        jwk.x = Some(b64url_encode(signing_key.verifying_key().as_bytes()));
        jwk.d = Some(b64url_encode(signing_key.to_bytes()));

        Ok(CryptoKeyPair::from_private_jwk(jwk, algorithm, extractable, usages))
    }

    fn sign(&self, _algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let jwk = require_kind(key, CryptoKeyKind::Private, KeyOperation::Sign)?;
        let seed = match PrivateKey::from_jwk(jwk)?.material {
            PrivateKeyMaterial::Okp { crv, d, .. } if crv == curves::ED25519 => {
                fixed::<32>(d.as_bytes(), "Ed25519 private key")?
            }
            _ => return Err(Error::InvalidKey("EdDSA requires an Ed25519 OKP key".into())),
        };

        let signing_key = SigningKey::from_bytes(&seed);
        let signature: Signature = signing_key.sign(data);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(
        &self,
        _algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        if !key.allows(KeyOperation::Verify) {
            return Err(Error::InvalidKey("Key usage Verify not permitted".into()));
        }
        let public = match PublicKey::from_jwk(key.handle())?.material {
            PublicKeyMaterial::Okp { crv, x } if crv == curves::ED25519 => {
                fixed::<32>(&x, "Ed25519 public key")?
            }
            _ => return Err(Error::InvalidKey("EdDSA requires an Ed25519 OKP key".into())),
        };

        let verifying_key = VerifyingKey::from_bytes(&public)
            .map_err(|e| Error::InvalidKey(format!("Invalid Ed25519 public key: {}", e)))?;

        if signature.len() != SIGNATURE_SIZE {
            return Ok(false);
        }
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let alg = Algorithm::new("EdDSA");
        let pair = EddsaProvider.generate_key_pair(&alg, true, &[]).unwrap();

        let signature = EddsaProvider.sign(&alg, &pair.private_key, b"Hello, World!").unwrap();
        assert_eq!(signature.len(), SIGNATURE_SIZE);
        assert!(EddsaProvider
            .verify(&alg, &pair.public_key, b"Hello, World!", &signature)
            .unwrap());
    }

    #[test]
    fn test_wrong_message_fails() {
        let alg = Algorithm::new("EdDSA");
        let pair = EddsaProvider.generate_key_pair(&alg, true, &[]).unwrap();

        let signature = EddsaProvider.sign(&alg, &pair.private_key, b"Original").unwrap();
        assert!(!EddsaProvider
            .verify(&alg, &pair.public_key, b"Tampered", &signature)
            .unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let alg = Algorithm::new("EdDSA");
        let alice = EddsaProvider.generate_key_pair(&alg, true, &[]).unwrap();
        let bob = EddsaProvider.generate_key_pair(&alg, true, &[]).unwrap();

        let signature = EddsaProvider.sign(&alg, &alice.private_key, b"from alice").unwrap();
        assert!(!EddsaProvider
            .verify(&alg, &bob.public_key, b"from alice", &signature)
            .unwrap());
    }

    #[test]
    fn test_deterministic() {
        let alg = Algorithm::new("EdDSA");
        let pair = EddsaProvider.generate_key_pair(&alg, true, &[]).unwrap();

        let first = EddsaProvider.sign(&alg, &pair.private_key, b"same").unwrap();
        let second = EddsaProvider.sign(&alg, &pair.private_key, b"same").unwrap();
        assert_eq!(first, second);
    }
}
