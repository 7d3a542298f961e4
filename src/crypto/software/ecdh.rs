//! ECDH-ES key agreement over secp256k1 and X25519.
//!
//! `derive_bits` returns the raw shared secret `Z`; the JOSE Concat KDF is
//! applied by the JWE layer.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::{fixed, sec1_uncompressed, secp256k1_private_jwk};
use crate::crypto::algorithm::{curves, params, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, CryptoKeyPair, Provider};
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{
    Jwk, KeyOperation, KeyType, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial,
};

/// ECDH-ES key agreement
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdhProvider;

impl Provider for EcdhProvider {
    fn name(&self) -> &str {
        "software-ecdh"
    }

    /// Generate a key-agreement key; `namedCurve` picks secp256k1 (default)
    /// or X25519
    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Result<CryptoKeyPair> {
        let curve = algorithm
            .param_str(params::NAMED_CURVE)
            .unwrap_or(curves::SECP256K1);

        let jwk = if curves::is_secp256k1(curve) {
            secp256k1_private_jwk(&k256::SecretKey::random(&mut OsRng))
        } else if curve == curves::X25519 {
            let secret = StaticSecret::random_from_rng(OsRng);
            let public = X25519PublicKey::from(&secret);
            let mut jwk = Jwk::new(KeyType::Okp);
            jwk.crv = Some(curves::X25519.to_string());
            jwk.x = Some(b64url_encode(public.as_bytes()));
            jwk.d = Some(b64url_encode(secret.to_bytes()));
            jwk
        } else {
            return Err(Error::UnsupportedCurve(curve.to_string()));
        };

        Ok(CryptoKeyPair::from_private_jwk(jwk, algorithm, extractable, usages))
    }

    fn derive_bits(
        &self,
        _algorithm: &Algorithm,
        private_key: &CryptoKey,
        public_key: &CryptoKey,
    ) -> Result<Vec<u8>> {
        let private = PrivateKey::from_jwk(require_kind(
            private_key,
            CryptoKeyKind::Private,
            KeyOperation::DeriveBits,
        )?)?;
        let public = PublicKey::from_jwk(public_key.handle())?;

        match (private.material, public.material) {
            (
                PrivateKeyMaterial::Ec { crv, d, .. },
                PublicKeyMaterial::Ec {
                    crv: peer_crv,
                    x,
                    y,
                },
            ) if curves::is_secp256k1(&crv) && curves::is_secp256k1(&peer_crv) => {
                let secret = k256::SecretKey::from_slice(d.as_bytes())
                    .map_err(|e| Error::InvalidKey(format!("secp256k1 private key: {}", e)))?;
                let peer = k256::PublicKey::from_sec1_bytes(&sec1_uncompressed(&x, &y)?)
                    .map_err(|e| Error::InvalidKey(format!("secp256k1 public key: {}", e)))?;
                let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            (
                PrivateKeyMaterial::Okp { crv, d, .. },
                PublicKeyMaterial::Okp { crv: peer_crv, x },
            ) if crv == curves::X25519 && peer_crv == curves::X25519 => {
                let secret = StaticSecret::from(fixed::<32>(d.as_bytes(), "X25519 private key")?);
                let peer = X25519PublicKey::from(fixed::<32>(&x, "X25519 public key")?);
                let shared = secret.diffie_hellman(&peer);
                if !shared.was_contributory() {
                    return Err(Error::InvalidKey("X25519 public key is a low-order point".into()));
                }
                Ok(shared.as_bytes().to_vec())
            }
            _ => Err(Error::InvalidKey(
                "ECDH-ES needs two keys on the same supported curve".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(curve: &str) -> CryptoKeyPair {
        let alg = Algorithm::new("ECDH-ES").with_param(params::NAMED_CURVE, curve);
        EcdhProvider.generate_key_pair(&alg, true, &[]).unwrap()
    }

    #[test]
    fn test_both_sides_agree_secp256k1() {
        let alice = pair("secp256k1");
        let bob = pair("secp256k1");
        let alg = Algorithm::new("ECDH-ES");

        let ab = EcdhProvider.derive_bits(&alg, &alice.private_key, &bob.public_key).unwrap();
        let ba = EcdhProvider.derive_bits(&alg, &bob.private_key, &alice.public_key).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_both_sides_agree_x25519() {
        let alice = pair("X25519");
        let bob = pair("X25519");
        let alg = Algorithm::new("ECDH-ES");

        let ab = EcdhProvider.derive_bits(&alg, &alice.private_key, &bob.public_key).unwrap();
        let ba = EcdhProvider.derive_bits(&alg, &bob.private_key, &alice.public_key).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_curve_mismatch_rejected() {
        let alice = pair("secp256k1");
        let bob = pair("X25519");
        assert!(EcdhProvider
            .derive_bits(&Algorithm::new("ECDH-ES"), &alice.private_key, &bob.public_key)
            .is_err());
    }

    #[test]
    fn test_unknown_curve() {
        let alg = Algorithm::new("ECDH-ES").with_param(params::NAMED_CURVE, "P-521");
        assert!(matches!(
            EcdhProvider.generate_key_pair(&alg, true, &[]),
            Err(Error::UnsupportedCurve(_))
        ));
    }
}
