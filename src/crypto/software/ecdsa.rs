//! ES256K: ECDSA over secp256k1 with SHA-256.
//!
//! Signatures are the 64-byte `r || s` form JOSE expects, produced
//! deterministically (RFC 6979).

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use super::sec1_uncompressed;
use crate::crypto::algorithm::{curves, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, CryptoKeyPair, Provider};
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{
    Jwk, KeyOperation, KeyType, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial,
};

/// secp256k1 ECDSA signer
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaProvider;

impl EcdsaProvider {
    fn signing_key(key: &CryptoKey) -> Result<SigningKey> {
        let jwk = require_kind(key, CryptoKeyKind::Private, KeyOperation::Sign)?;
        match PrivateKey::from_jwk(jwk)?.material {
            PrivateKeyMaterial::Ec { crv, d, .. } if curves::is_secp256k1(&crv) => {
                SigningKey::from_slice(d.as_bytes())
                    .map_err(|e| Error::InvalidKey(format!("secp256k1 private key: {}", e)))
            }
            _ => Err(Error::InvalidKey("ES256K requires a secp256k1 EC key".into())),
        }
    }

    fn verifying_key(key: &CryptoKey) -> Result<VerifyingKey> {
        if !key.allows(KeyOperation::Verify) {
            return Err(Error::InvalidKey("Key usage Verify not permitted".into()));
        }
        match PublicKey::from_jwk(key.handle())?.material {
            PublicKeyMaterial::Ec { crv, x, y } if curves::is_secp256k1(&crv) => {
                VerifyingKey::from_sec1_bytes(&sec1_uncompressed(&x, &y)?)
                    .map_err(|e| Error::InvalidKey(format!("secp256k1 public key: {}", e)))
            }
            _ => Err(Error::InvalidKey("ES256K requires a secp256k1 EC key".into())),
        }
    }
}

impl Provider for EcdsaProvider {
    fn name(&self) -> &str {
        "software-ecdsa"
    }

    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Result<CryptoKeyPair> {
        let secret = k256::SecretKey::random(&mut OsRng);
        let jwk = secp256k1_private_jwk(&secret);
        Ok(CryptoKeyPair::from_private_jwk(jwk, algorithm, extractable, usages))
    }

    fn sign(&self, _algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = Self::signing_key(key)?;
        let signature: Signature = signing_key
            .try_sign(data)
            .map_err(|e| Error::SigningFailed(format!("ES256K: {}", e)))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(
        &self,
        _algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let verifying_key = Self::verifying_key(key)?;
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}

/// Private EC JWK (`crv = secp256k1`) for a secret scalar
pub(crate) fn secp256k1_private_jwk(secret: &k256::SecretKey) -> Jwk {
    let point = secret.public_key().to_encoded_point(false);
    let mut jwk = Jwk::new(KeyType::Ec);
    jwk.crv = Some(curves::SECP256K1.to_string());
    jwk.x = point.x().map(|x| b64url_encode(x));
    jwk.y = point.y().map(|y| b64url_encode(y));
    jwk.d = Some(b64url_encode(secret.to_bytes()));
    jwk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> CryptoKeyPair {
        EcdsaProvider
            .generate_key_pair(
                &Algorithm::new("ES256K"),
                true,
                &[KeyOperation::Sign, KeyOperation::Verify],
            )
            .unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let pair = keypair();
        let alg = Algorithm::new("ES256K");

        let signature = EcdsaProvider.sign(&alg, &pair.private_key, b"hello").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(EcdsaProvider.verify(&alg, &pair.public_key, b"hello", &signature).unwrap());
        assert!(!EcdsaProvider.verify(&alg, &pair.public_key, b"hellO", &signature).unwrap());
    }

    #[test]
    fn test_deterministic_signature() {
        let pair = keypair();
        let alg = Algorithm::new("ES256K");
        let first = EcdsaProvider.sign(&alg, &pair.private_key, b"same").unwrap();
        let second = EcdsaProvider.sign(&alg, &pair.private_key, b"same").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_garbage_signature_is_false() {
        let pair = keypair();
        let alg = Algorithm::new("ES256K");
        assert!(!EcdsaProvider.verify(&alg, &pair.public_key, b"x", &[1, 2, 3]).unwrap());
    }

    #[test]
    fn test_generated_jwk_shape() {
        let pair = keypair();
        let private = pair.private_key.handle();
        assert_eq!(private.crv.as_deref(), Some("secp256k1"));
        assert!(private.is_private());
        assert!(!pair.public_key.handle().is_private());
        assert_eq!(
            pair.public_key.usages(),
            &[KeyOperation::Verify][..]
        );
    }

    #[test]
    fn test_public_key_cannot_sign() {
        let pair = keypair();
        let err = EcdsaProvider
            .sign(&Algorithm::new("ES256K"), &pair.public_key, b"x")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }
}
