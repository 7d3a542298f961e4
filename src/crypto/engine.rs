//! # Crypto Engine
//!
//! The facade the rest of the crate talks to. It ties a [`KeyStore`] to a
//! [`ProviderRegistry`]: keys are looked up by reference, the provider is
//! resolved by algorithm name and scope, and the key is imported into the
//! provider before the primitive runs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SIGN BY REFERENCE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  sign(payload, "did", None)                                            │
//! │     │                                                                   │
//! │     ├── key_store.get_private_key("did").latest()                      │
//! │     │      (or get_secret_key for MAC keys)                            │
//! │     ├── alg = caller's alg ─► key's alg ─► NoAlgorithmSpecified        │
//! │     ├── registry.get_signer(alg, PrivateOnly)                          │
//! │     ├── provider.import_key(jwk, alg, ...)                             │
//! │     └── provider.sign(alg, handle, payload)                            │
//! │                                                                         │
//! │  verify() mirrors this with the public key and scope PublicOnly.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::crypto::algorithm::{names, params, Algorithm};
use crate::crypto::provider::{CryptoKey, Provider, ProviderScope};
use crate::crypto::registry::ProviderRegistry;
use crate::error::{Error, Result};
use crate::keys::{Jwk, Key, KeyOperation, KeyType, PrivateKey, PublicKey};
use crate::keystore::KeyStore;
use crate::seed::MasterSeed;

/// Public exponent of generated RSA keys
const RSA_PUBLIC_EXPONENT: u64 = 65537;

/// Sign, verify, encrypt and generate keys against a key store
#[derive(Clone)]
pub struct CryptoEngine {
    key_store: Arc<dyn KeyStore>,
    registry: ProviderRegistry,
    config: EngineConfig,
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl CryptoEngine {
    /// Engine with the software providers and default configuration
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self::with_registry(key_store, ProviderRegistry::with_defaults())
    }

    /// Engine with a caller-built registry
    pub fn with_registry(key_store: Arc<dyn KeyStore>, registry: ProviderRegistry) -> Self {
        Self {
            key_store,
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration after validating it
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The key store
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// The provider registry
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for adding platform providers
    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    /// The configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // SIGNATURES
    // ========================================================================

    /// Sign `payload` with the latest key under `reference`
    ///
    /// Private keys are tried first, then secret (MAC) keys.
    pub fn sign(&self, payload: &[u8], reference: &str, algorithm: Option<&str>) -> Result<Vec<u8>> {
        let key = self.signing_key(reference)?;
        self.sign_with_key(payload, &key, algorithm)
    }

    /// Sign `payload` with an explicit private or secret key
    pub fn sign_with_key(&self, payload: &[u8], key: &Key, algorithm: Option<&str>) -> Result<Vec<u8>> {
        let jwk = key.to_jwk();
        let algorithm = resolve_algorithm(algorithm, &jwk)?;
        let provider = match key {
            Key::Private(_) => self.registry.get_signer(&algorithm.name, ProviderScope::PrivateOnly)?,
            Key::Secret(_) => self
                .registry
                .get_mac_signer(&algorithm.name, ProviderScope::PrivateOnly)?,
            Key::Public(_) => {
                return Err(Error::InvalidKey("Cannot sign with a public key".into()))
            }
        };

        let handle = import(provider.as_ref(), &jwk, &algorithm)?;
        let signature = provider.sign(&algorithm, &handle, payload)?;
        tracing::debug!(
            "Signed {} bytes with {} (kid {})",
            payload.len(),
            algorithm.name,
            jwk.kid.as_deref().unwrap_or("none")
        );
        Ok(signature)
    }

    /// Verify `signature` over `payload` with the latest key under `reference`
    ///
    /// Returns [`Error::SignatureInvalid`] when the signature does not match.
    pub fn verify(
        &self,
        payload: &[u8],
        signature: &[u8],
        reference: &str,
        algorithm: Option<&str>,
    ) -> Result<()> {
        let key = match self.key_store.get_public_key(reference) {
            Ok(container) => Key::Public(container.latest().clone()),
            Err(Error::KeyNotFound(_)) => {
                Key::Secret(self.key_store.get_secret_key(reference)?.latest().clone())
            }
            Err(e) => return Err(e),
        };
        self.verify_with_key(payload, signature, &key, algorithm)
    }

    /// Verify `signature` with an explicit key
    ///
    /// A private key is reduced to its public half first.
    pub fn verify_with_key(
        &self,
        payload: &[u8],
        signature: &[u8],
        key: &Key,
        algorithm: Option<&str>,
    ) -> Result<()> {
        let (jwk, provider_for) = match key {
            Key::Public(key) => (key.to_jwk(), Family::Signer),
            Key::Private(key) => (key.public_key().to_jwk(), Family::Signer),
            Key::Secret(key) => (key.to_jwk(), Family::Mac),
        };
        let algorithm = resolve_algorithm(algorithm, &jwk)?;
        let provider = match provider_for {
            Family::Signer => self.registry.get_signer(&algorithm.name, ProviderScope::PublicOnly)?,
            Family::Mac => self
                .registry
                .get_mac_signer(&algorithm.name, ProviderScope::PublicOnly)?,
        };

        let handle = import(provider.as_ref(), &jwk, &algorithm)?;
        if provider.verify(&algorithm, &handle, payload, signature)? {
            Ok(())
        } else {
            tracing::warn!(
                "Signature verification failed ({}, kid {})",
                algorithm.name,
                jwk.kid.as_deref().unwrap_or("none")
            );
            Err(Error::SignatureInvalid)
        }
    }

    /// Latest private key under `reference`, else the latest secret key
    pub fn signing_key(&self, reference: &str) -> Result<Key> {
        match self.key_store.get_private_key(reference) {
            Ok(container) => Ok(Key::Private(container.latest().clone())),
            Err(Error::KeyNotFound(_)) => Ok(Key::Secret(
                self.key_store.get_secret_key(reference)?.latest().clone(),
            )),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // KEY GENERATION
    // ========================================================================

    /// Generate a key pair, save the private key under `reference` and
    /// return the public key
    ///
    /// | Type | Algorithm | Extractable |
    /// |------|-----------|-------------|
    /// | RSA | RS256, `config.rsa_modulus_bits`, e = 65537 | no |
    /// | EC | ES256K on `config.ec_curve` | yes |
    /// | OKP | EdDSA (Ed25519) | yes |
    /// | oct | [`Error::CannotGenerateSymmetricKey`] | |
    ///
    /// The kid is the RFC 7638 thumbprint of the public key.
    pub fn generate_key_pair(&self, reference: &str, kty: KeyType) -> Result<PublicKey> {
        let (algorithm, extractable) = match kty {
            KeyType::Rsa => (
                Algorithm::new(names::RS256)
                    .with_param(params::MODULUS_LENGTH, self.config.rsa_modulus_bits as u64)
                    .with_param(params::PUBLIC_EXPONENT, RSA_PUBLIC_EXPONENT)
                    .with_param(params::HASH, names::SHA256),
                false,
            ),
            KeyType::Ec => (
                Algorithm::new(names::ES256K)
                    .with_param(params::NAMED_CURVE, self.config.ec_curve.as_str()),
                true,
            ),
            KeyType::Okp => (Algorithm::new(names::EDDSA), true),
            KeyType::Oct => return Err(Error::CannotGenerateSymmetricKey),
        };

        let provider = self
            .registry
            .get_signer(&algorithm.name, ProviderScope::PrivateOnly)?;
        let pair = provider.generate_key_pair(
            &algorithm,
            extractable,
            &[KeyOperation::Sign, KeyOperation::Verify],
        )?;

        // Non-extractable keys are saved through their native handle
        let mut jwk = match provider.export_key_jwk(&pair.private_key) {
            Ok(jwk) => jwk,
            Err(Error::KeyNotExtractable) => pair.private_key.handle().clone(),
            Err(e) => return Err(e),
        };
        jwk.kid = Some(jwk.to_public().thumbprint()?);
        jwk.alg = Some(algorithm.name.clone());

        let private = PrivateKey::from_jwk(&jwk)?;
        let public = private.public_key();
        self.key_store.save(reference, Key::Private(private))?;

        tracing::info!(
            "Generated {} key pair under '{}' (kid {})",
            kty,
            reference,
            jwk.kid.as_deref().unwrap_or("none")
        );
        Ok(public)
    }

    /// Generate a throwaway key-agreement key on `curve` (secp256k1 or X25519)
    pub fn generate_ephemeral_key(&self, curve: &str) -> Result<PrivateKey> {
        let algorithm = Algorithm::new(names::ECDH_ES).with_param(params::NAMED_CURVE, curve);
        let provider = self
            .registry
            .get_shared_key_encrypter(names::ECDH_ES, ProviderScope::PrivateOnly)?;
        let pair = provider.generate_key_pair(&algorithm, true, &[KeyOperation::DeriveBits])?;
        PrivateKey::from_jwk(&provider.export_key_jwk(&pair.private_key)?)
    }

    /// A fresh random master seed for pairwise derivation
    pub fn generate_seed(&self) -> MasterSeed {
        MasterSeed::generate()
    }

    // ========================================================================
    // ENCRYPTION
    // ========================================================================

    /// Encrypt with a content-encryption or key-management algorithm
    ///
    /// A private key is reduced to its public half.
    pub fn encrypt(&self, algorithm: &Algorithm, key: &Key, data: &[u8]) -> Result<Vec<u8>> {
        let jwk = match key {
            Key::Private(key) => key.public_key().to_jwk(),
            other => other.to_jwk(),
        };
        let provider = self.encrypter(&algorithm.name, ProviderScope::PublicOnly)?;
        let handle = import(provider.as_ref(), &jwk, algorithm)?;
        provider.encrypt(algorithm, &handle, data)
    }

    /// Decrypt with a content-encryption or key-management algorithm
    pub fn decrypt(&self, algorithm: &Algorithm, key: &Key, data: &[u8]) -> Result<Vec<u8>> {
        if let Key::Public(_) = key {
            return Err(Error::InvalidKey("Cannot decrypt with a public key".into()));
        }
        let provider = self.encrypter(&algorithm.name, ProviderScope::PrivateOnly)?;
        let handle = import(provider.as_ref(), &key.to_jwk(), algorithm)?;
        provider.decrypt(algorithm, &handle, data)
    }

    /// Raw key-agreement secret between `private_key` and `public_key`
    pub fn derive_bits(
        &self,
        algorithm: &Algorithm,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<Vec<u8>> {
        let provider = self
            .registry
            .get_shared_key_encrypter(&algorithm.name, ProviderScope::PrivateOnly)?;
        let private = import(provider.as_ref(), &private_key.to_jwk(), algorithm)?;
        let public = import(provider.as_ref(), &public_key.to_jwk(), algorithm)?;
        provider.derive_bits(algorithm, &private, &public)
    }

    /// Hash `data` with the named digest (`SHA-256`, `SHA-384`, `SHA-512`)
    pub fn digest(&self, name: &str, data: &[u8]) -> Result<Vec<u8>> {
        let algorithm = Algorithm::new(name);
        self.registry
            .get_digest(name, ProviderScope::All)?
            .digest(&algorithm, data)
    }

    /// Content encrypters first, then key-management encrypters
    fn encrypter(&self, name: &str, scope: ProviderScope) -> Result<Arc<dyn Provider>> {
        match self.registry.get_symmetric_encrypter(name, scope) {
            Ok(provider) => Ok(provider),
            Err(Error::NoProviderForAlgorithm { .. }) => {
                self.registry.get_shared_key_encrypter(name, scope)
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Clone, Copy)]
enum Family {
    Signer,
    Mac,
}

/// Caller's algorithm, else the key's `alg`
fn resolve_algorithm(requested: Option<&str>, jwk: &Jwk) -> Result<Algorithm> {
    requested
        .or(jwk.alg.as_deref())
        .map(Algorithm::new)
        .ok_or(Error::NoAlgorithmSpecified)
}

/// Import a stored key; `key_ops` becomes the usage list
fn import(provider: &dyn Provider, jwk: &Jwk, algorithm: &Algorithm) -> Result<CryptoKey> {
    let usages = jwk.key_ops.clone().unwrap_or_default();
    provider.import_key(jwk, algorithm, false, &usages)
}
