//! RSA signatures (RS256/384/512, PS256) and RSA-OAEP key encryption.

use num_traits::One;
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Oaep, Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::crypto::algorithm::{names, params, Algorithm};
use crate::crypto::provider::{require_kind, CryptoKey, CryptoKeyKind, CryptoKeyPair, Provider};
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{
    Jwk, KeyOperation, KeyType, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial,
};

/// Modulus size when the algorithm names none
const DEFAULT_MODULUS_BITS: usize = 2048;

/// F4
const DEFAULT_PUBLIC_EXPONENT: u32 = 65537;

/// RSA signer and key encrypter
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaProvider;

enum Padding {
    Pkcs1(Pkcs1v15Sign),
    Pss(Pss),
}

/// Hash `data` and pick the padding for a signature algorithm
fn signature_scheme(algorithm: &Algorithm, data: &[u8]) -> Result<(Vec<u8>, Padding)> {
    let name = algorithm.name.to_ascii_uppercase();
    let scheme = match name.as_str() {
        names::RS256 => (Sha256::digest(data).to_vec(), Padding::Pkcs1(Pkcs1v15Sign::new::<Sha256>())),
        names::RS384 => (Sha384::digest(data).to_vec(), Padding::Pkcs1(Pkcs1v15Sign::new::<Sha384>())),
        names::RS512 => (Sha512::digest(data).to_vec(), Padding::Pkcs1(Pkcs1v15Sign::new::<Sha512>())),
        names::PS256 => (Sha256::digest(data).to_vec(), Padding::Pss(Pss::new::<Sha256>())),
        _ => {
            return Err(Error::UnsupportedOperation(format!(
                "RSA signature algorithm {}",
                algorithm.name
            )))
        }
    };
    Ok(scheme)
}

fn oaep(algorithm: &Algorithm) -> Result<Oaep> {
    if algorithm.is(names::RSA_OAEP) {
        Ok(Oaep::new::<Sha1>())
    } else if algorithm.is(names::RSA_OAEP_256) {
        Ok(Oaep::new::<Sha256>())
    } else {
        Err(Error::UnsupportedOperation(format!(
            "RSA encryption algorithm {}",
            algorithm.name
        )))
    }
}

fn public_key(key: &CryptoKey) -> Result<RsaPublicKey> {
    match PublicKey::from_jwk(key.handle())?.material {
        PublicKeyMaterial::Rsa { n, e } => {
            RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
                .map_err(|e| Error::InvalidKey(format!("RSA public key: {}", e)))
        }
        _ => Err(Error::InvalidKey("Expected an RSA key".into())),
    }
}

fn private_key(jwk: &Jwk) -> Result<RsaPrivateKey> {
    let parts = match PrivateKey::from_jwk(jwk)?.material {
        PrivateKeyMaterial::Rsa(parts) => parts,
        _ => return Err(Error::InvalidKey("Expected an RSA key".into())),
    };
    let (p, q) = match (&parts.p, &parts.q) {
        (Some(p), Some(q)) => (p, q),
        _ => {
            return Err(Error::InvalidKey(
                "RSA private key without prime factors".into(),
            ))
        }
    };

    RsaPrivateKey::from_components(
        BigUint::from_bytes_be(&parts.n),
        BigUint::from_bytes_be(&parts.e),
        BigUint::from_bytes_be(parts.d.as_bytes()),
        vec![
            BigUint::from_bytes_be(p.as_bytes()),
            BigUint::from_bytes_be(q.as_bytes()),
        ],
    )
    .map_err(|e| Error::InvalidKey(format!("RSA private key: {}", e)))
}

impl Provider for RsaProvider {
    fn name(&self) -> &str {
        "software-rsa"
    }

    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Result<CryptoKeyPair> {
        let bits = algorithm
            .param_u64(params::MODULUS_LENGTH)
            .map(|bits| bits as usize)
            .unwrap_or(DEFAULT_MODULUS_BITS);
        let exponent = algorithm
            .param_u64(params::PUBLIC_EXPONENT)
            .map(BigUint::from)
            .unwrap_or_else(|| BigUint::from(DEFAULT_PUBLIC_EXPONENT));

        tracing::debug!("Generating {}-bit RSA key", bits);
        let key = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exponent)
            .map_err(|e| Error::Internal(format!("RSA key generation failed: {}", e)))?;

        let primes = key.primes();
        if primes.len() != 2 {
            return Err(Error::Internal("RSA key generation produced a multi-prime key".into()));
        }
        let jwk = rsa_private_jwk(key.n(), key.e(), key.d(), &primes[0], &primes[1])?;
        Ok(CryptoKeyPair::from_private_jwk(jwk, algorithm, extractable, usages))
    }

    fn sign(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let jwk = require_kind(key, CryptoKeyKind::Private, KeyOperation::Sign)?;
        let private = private_key(jwk)?;
        let (hashed, padding) = signature_scheme(algorithm, data)?;

        let signature = match padding {
            Padding::Pkcs1(scheme) => private.sign(scheme, &hashed),
            Padding::Pss(scheme) => private.sign_with_rng(&mut OsRng, scheme, &hashed),
        };
        signature.map_err(|e| Error::SigningFailed(format!("{}: {}", algorithm.name, e)))
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        if !key.allows(KeyOperation::Verify) {
            return Err(Error::InvalidKey("Key usage Verify not permitted".into()));
        }
        let public = public_key(key)?;
        let (hashed, padding) = signature_scheme(algorithm, data)?;

        let result = match padding {
            Padding::Pkcs1(scheme) => public.verify(scheme, &hashed, signature),
            Padding::Pss(scheme) => public.verify(scheme, &hashed, signature),
        };
        Ok(result.is_ok())
    }

    fn encrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        if !key.allows(KeyOperation::WrapKey) && !key.allows(KeyOperation::Encrypt) {
            return Err(Error::InvalidKey("Key usage WrapKey not permitted".into()));
        }
        let public = public_key(key)?;
        public
            .encrypt(&mut OsRng, oaep(algorithm)?, data)
            .map_err(|e| Error::EncryptionFailed(format!("{}: {}", algorithm.name, e)))
    }

    fn decrypt(&self, algorithm: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let jwk = require_kind(key, CryptoKeyKind::Private, KeyOperation::UnwrapKey)
            .or_else(|_| require_kind(key, CryptoKeyKind::Private, KeyOperation::Decrypt))?;
        let private = private_key(jwk)?;
        private
            .decrypt(oaep(algorithm)?, data)
            .map_err(|_| Error::DecryptionFailed(format!("{} unwrap failed", algorithm.name)))
    }
}

/// Private RSA JWK with CRT parameters computed from the two primes
pub(crate) fn rsa_private_jwk(
    n: &BigUint,
    e: &BigUint,
    d: &BigUint,
    p: &BigUint,
    q: &BigUint,
) -> Result<Jwk> {
    let one = BigUint::one();
    let dp = d % (p - &one);
    let dq = d % (q - &one);
    let qi = crt_coefficient(p, q)?;

    let mut jwk = Jwk::new(KeyType::Rsa);
    jwk.n = Some(b64url_encode(n.to_bytes_be()));
    jwk.e = Some(b64url_encode(e.to_bytes_be()));
    jwk.d = Some(b64url_encode(d.to_bytes_be()));
    jwk.p = Some(b64url_encode(p.to_bytes_be()));
    jwk.q = Some(b64url_encode(q.to_bytes_be()));
    jwk.dp = Some(b64url_encode(dp.to_bytes_be()));
    jwk.dq = Some(b64url_encode(dq.to_bytes_be()));
    jwk.qi = Some(b64url_encode(qi.to_bytes_be()));
    Ok(jwk)
}

/// `q⁻¹ mod p`
fn crt_coefficient(p: &BigUint, q: &BigUint) -> Result<BigUint> {
    use num_bigint_dig::ModInverse;

    q.clone()
        .mod_inverse(p)
        .and_then(|inverse| inverse.to_biguint())
        .ok_or_else(|| Error::KeyDerivationFailed("RSA primes are not coprime".into()))
}
