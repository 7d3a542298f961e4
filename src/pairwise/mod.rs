//! # Pairwise Keys
//!
//! One master seed, many unlinkable identities. Each `(persona, peer)`
//! pair gets its own key, derived deterministically so it never needs a
//! backup of its own: the seed alone recreates every pairwise key.
//!
//! ## Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PAIRWISE KEY DERIVATION                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  MasterSeed                                                            │
//! │      │                                                                  │
//! │      │  HMAC-SHA512(key = seed, msg = persona)                         │
//! │      ▼                                                                  │
//! │  Persona master key (64 bytes)                                         │
//! │      │                                                                  │
//! │      ├── EC:  HMAC-SHA256(pmk, peer) ─────► d  (secp256k1 scalar)      │
//! │      │                                                                  │
//! │      └── RSA: h0 = HMAC-SHA512(pmk, peer)                              │
//! │               h(i+1) = HMAC-SHA512(pmk, h(i))                          │
//! │               [h0 .. h(r-1)]   ──► prime search ──► p                  │
//! │               [h(r) .. h(2r-1)] ─► prime search ──► q                  │
//! │               n = p·q,  d = e⁻¹ mod λ(n)                               │
//! │                                                                         │
//! │  Stored under "{persona}.{peer}", kid = JWK thumbprint                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//!
//! | Property | How |
//! |----------|-----|
//! | Deterministic | Only HMAC and a deterministic prime search |
//! | Unlinkable | Different persona or peer → independent HMAC outputs |
//! | Recoverable | Seed (or its recovery phrase) recreates every key |
//!
//! All HMACs run through the engine's MAC providers.

mod ec;
mod rsa;

pub use self::rsa::{find_prime, PrimeSearch};

use zeroize::Zeroizing;

use crate::crypto::algorithm::{curves, names};
use crate::crypto::CryptoEngine;
use crate::error::{Error, Result};
use crate::keys::{Jwk, Key, KeyType, PrivateKey, PublicKey, SecretBytes, SecretKey};
use crate::seed::MasterSeed;

/// Key-store reference of a pairwise key
pub fn pairwise_reference(persona: &str, peer: &str) -> String {
    format!("{}.{}", persona, peer)
}

/// Derives and stores pairwise keys through a [`CryptoEngine`]
#[derive(Debug, Clone, Copy)]
pub struct PairwiseKeyGenerator<'a> {
    engine: &'a CryptoEngine,
}

impl<'a> PairwiseKeyGenerator<'a> {
    /// Derive with `engine`'s providers, store in its key store
    pub fn new(engine: &'a CryptoEngine) -> Self {
        Self { engine }
    }

    /// `HMAC-SHA512(seed, persona)`
    pub fn persona_master_key(&self, seed: &MasterSeed, persona: &str) -> Result<SecretBytes> {
        let key = self.hmac(names::HS512, seed.as_bytes(), persona.as_bytes())?;
        Ok(SecretBytes::new(key.to_vec()))
    }

    /// Derive the pairwise key without storing it
    ///
    /// EC keys are on secp256k1; see [`Self::derive_ec`] for the aliases.
    pub fn derive(
        &self,
        seed: &MasterSeed,
        persona: &str,
        peer: &str,
        kty: KeyType,
    ) -> Result<PrivateKey> {
        match kty {
            KeyType::Ec => self.derive_ec(seed, persona, peer, curves::SECP256K1),
            KeyType::Rsa => self.derive_rsa(seed, persona, peer),
            KeyType::Oct => Err(Error::CannotGenerateSymmetricKey),
            KeyType::Okp => Err(Error::UnsupportedOperation(
                "Pairwise OKP keys are not supported".into(),
            )),
        }
    }

    /// Derive a pairwise EC key on `curve` (`secp256k1`, `P-256K` or `K-256`)
    pub fn derive_ec(
        &self,
        seed: &MasterSeed,
        persona: &str,
        peer: &str,
        curve: &str,
    ) -> Result<PrivateKey> {
        if !curves::is_secp256k1(curve) {
            return Err(Error::UnsupportedCurve(curve.to_string()));
        }
        let pmk = self.persona_master_key(seed, persona)?;
        let pairwise_seed = self.hmac(names::HS256, pmk.as_bytes(), peer.as_bytes())?;

        let jwk = ec::private_jwk(&pairwise_seed, curve)?;
        finish(jwk, names::ES256K)
    }

    /// Derive a pairwise RSA key of `config.pairwise.rsa_modulus_bits`
    pub fn derive_rsa(&self, seed: &MasterSeed, persona: &str, peer: &str) -> Result<PrivateKey> {
        let config = &self.engine.config().pairwise;
        let pmk = self.persona_master_key(seed, persona)?;
        let chain = |data: &[u8]| self.hmac(names::HS512, pmk.as_bytes(), data);

        let jwk = rsa::private_jwk(&chain, peer, config)?;
        finish(jwk, names::RS256)
    }

    /// Derive the pairwise key, store it under `"{persona}.{peer}"` and
    /// return its public key
    ///
    /// Deriving an already stored key does not add a second version.
    pub fn generate(
        &self,
        seed: &MasterSeed,
        persona: &str,
        peer: &str,
        kty: KeyType,
    ) -> Result<PublicKey> {
        let private = self.derive(seed, persona, peer, kty)?;
        let public = private.public_key();
        let reference = pairwise_reference(persona, peer);
        let kid = public.metadata.kid.clone().unwrap_or_default();

        let key_store = self.engine.key_store();
        if key_store.get_private_key_by_id(&kid)?.is_some() {
            tracing::debug!("Pairwise key {} already stored under '{}'", kid, reference);
        } else {
            key_store.save(&reference, Key::Private(private))?;
            tracing::info!("Stored pairwise {} key under '{}' (kid {})", kty, reference, kid);
        }
        Ok(public)
    }

    fn hmac(&self, alg: &str, key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let key = Key::Secret(SecretKey::from_bytes(key.to_vec()));
        let tag = self
            .engine
            .sign_with_key(data, &key, Some(alg))
            .map_err(|e| Error::KeyDerivationFailed(format!("{}: {}", alg, e)))?;
        Ok(Zeroizing::new(tag))
    }
}

/// Stamp `alg` and the thumbprint kid, then type the key
fn finish(mut jwk: Jwk, alg: &str) -> Result<PrivateKey> {
    jwk.alg = Some(alg.to_string());
    jwk.kid = Some(jwk.to_public().thumbprint()?);
    PrivateKey::from_jwk(&jwk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::encoding::b64url_encode;
    use crate::keys::KeyVersion;
    use crate::keystore::{InMemoryKeyStore, KeyStore};

    fn engine() -> CryptoEngine {
        let mut config = EngineConfig::default();
        config.pairwise.rsa_modulus_bits = 512;
        CryptoEngine::new(Arc::new(InMemoryKeyStore::new()))
            .with_config(config)
            .unwrap()
    }

    fn seed() -> MasterSeed {
        MasterSeed::from_bytes(b"abcdefg".to_vec()).unwrap()
    }

    #[test]
    fn test_persona_master_key_vector() {
        let engine = engine();
        let pmk = PairwiseKeyGenerator::new(&engine)
            .persona_master_key(&seed(), "persona")
            .unwrap();
        assert_eq!(
            b64url_encode(pmk.as_bytes()),
            "h-Z5gO1eBjY1EYXh64-f8qQF5ojeh1KVMKxmd0JI3YKScTOYjVm-h1j2pUNV8q6s8yphAR4lk5yXYiQhAOVlUw"
        );
    }

    #[test]
    fn test_personas_unlinkable() {
        let engine = engine();
        let generator = PairwiseKeyGenerator::new(&engine);
        let a = generator.persona_master_key(&seed(), "persona").unwrap();
        let b = generator.persona_master_key(&seed(), "persona1").unwrap();
        assert_ne!(a, b);

        let ka = generator.derive(&seed(), "persona", "peer", KeyType::Ec).unwrap();
        let kb = generator.derive(&seed(), "persona1", "peer", KeyType::Ec).unwrap();
        assert_ne!(ka.public_key(), kb.public_key());
    }

    #[test]
    fn test_ec_deterministic() {
        let engine = engine();
        let generator = PairwiseKeyGenerator::new(&engine);
        let first = generator.derive(&seed(), "persona", "did:peer:1", KeyType::Ec).unwrap();
        let second = generator.derive(&seed(), "persona", "did:peer:1", KeyType::Ec).unwrap();
        assert_eq!(first, second);

        let other_peer = generator.derive(&seed(), "persona", "did:peer:2", KeyType::Ec).unwrap();
        assert_ne!(first.public_key(), other_peer.public_key());
    }

    #[test]
    fn test_ec_curve_aliases() {
        let engine = engine();
        let generator = PairwiseKeyGenerator::new(&engine);
        let key = generator.derive_ec(&seed(), "persona", "peer", "P-256K").unwrap();
        assert_eq!(key.to_jwk().crv.as_deref(), Some("P-256K"));

        assert!(matches!(
            generator.derive_ec(&seed(), "persona", "peer", "P-256"),
            Err(Error::UnsupportedCurve(_))
        ));
    }

    #[test]
    fn test_rsa_deterministic_and_usable() {
        let engine = engine();
        let generator = PairwiseKeyGenerator::new(&engine);
        let first = generator.derive_rsa(&seed(), "persona", "peer").unwrap();
        let second = generator.derive_rsa(&seed(), "persona", "peer").unwrap();
        assert_eq!(first, second);

        let key = Key::Private(first);
        let signature = engine.sign_with_key(b"payload", &key, None).unwrap();
        engine.verify_with_key(b"payload", &signature, &key, None).unwrap();
    }

    #[test]
    fn test_generate_stores_once() {
        let engine = engine();
        let generator = PairwiseKeyGenerator::new(&engine);
        let public = generator.generate(&seed(), "persona", "peer", KeyType::Ec).unwrap();
        generator.generate(&seed(), "persona", "peer", KeyType::Ec).unwrap();

        let stored = engine.key_store().get_private_key("persona.peer").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.latest().public_key(), public);
        assert_eq!(public.kid().map(str::to_string), Some(public.to_jwk().thumbprint().unwrap()));

        let signature = engine.sign(b"hello", "persona.peer", None).unwrap();
        engine.verify(b"hello", &signature, "persona.peer", None).unwrap();
    }

    #[test]
    fn test_symmetric_rejected() {
        let engine = engine();
        assert!(matches!(
            PairwiseKeyGenerator::new(&engine).derive(&seed(), "p", "q", KeyType::Oct),
            Err(Error::CannotGenerateSymmetricKey)
        ));
    }
}
