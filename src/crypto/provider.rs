//! # Provider Interface
//!
//! A provider implements the primitives of one algorithm family. It is the
//! seam between the engine and whatever actually holds key material: the
//! software providers in [`crate::crypto::software`], or a platform key
//! store that keeps private keys behind a hardware boundary.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PROVIDER OPERATIONS                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  import_key(jwk, alg, extractable, usages)  → CryptoKey (opaque handle) │
//! │  export_key_jwk(CryptoKey)                  → Jwk (if extractable)      │
//! │  generate_key_pair(alg, extractable, usages)→ CryptoKeyPair             │
//! │                                                                         │
//! │  sign(alg, key, data)            → signature bytes                      │
//! │  verify(alg, key, data, sig)     → bool                                 │
//! │  digest(alg, data)               → hash bytes                           │
//! │  encrypt / decrypt(alg, key, data) → bytes                              │
//! │  derive_bits(alg, private, public, length) → shared secret bytes        │
//! │                                                                         │
//! │  Every primitive defaults to UnsupportedOperation; a provider only      │
//! │  overrides what its family offers.                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::crypto::algorithm::Algorithm;
use crate::error::{Error, Result};
use crate::keys::{Jwk, KeyOperation, KeyType};

/// Key visibility a provider is registered for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderScope {
    /// Public-key operations only (verify, encrypt to a public key)
    PublicOnly,
    /// Private-key operations only (sign, decrypt)
    PrivateOnly,
    /// Both
    All,
}

impl std::fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderScope::PublicOnly => "public",
            ProviderScope::PrivateOnly => "private",
            ProviderScope::All => "all",
        };
        f.write_str(name)
    }
}

/// Which half of a key a [`CryptoKey`] handle refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoKeyKind {
    /// Public key
    Public,
    /// Private key
    Private,
    /// Symmetric key
    Secret,
}

/// A key imported into a provider
///
/// Software providers keep the JWK as their native handle; platform
/// providers typically keep only public members plus a `kid` naming the
/// sealed key.
#[derive(Clone, Debug)]
pub struct CryptoKey {
    algorithm: Algorithm,
    kind: CryptoKeyKind,
    extractable: bool,
    usages: Vec<KeyOperation>,
    handle: Jwk,
}

impl CryptoKey {
    /// Wrap a native handle
    pub fn new(
        handle: Jwk,
        algorithm: Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Self {
        let kind = match handle.kty {
            KeyType::Oct => CryptoKeyKind::Secret,
            _ if handle.is_private() => CryptoKeyKind::Private,
            _ => CryptoKeyKind::Public,
        };
        Self {
            algorithm,
            kind,
            extractable,
            usages: usages.to_vec(),
            handle,
        }
    }

    /// Algorithm the key was imported for
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Key kind
    pub fn kind(&self) -> CryptoKeyKind {
        self.kind
    }

    /// Whether `export_key_jwk` may reveal private members
    pub fn extractable(&self) -> bool {
        self.extractable
    }

    /// Permitted usages
    pub fn usages(&self) -> &[KeyOperation] {
        &self.usages
    }

    /// Whether `usage` is permitted (an empty list permits everything)
    pub fn allows(&self, usage: KeyOperation) -> bool {
        self.usages.is_empty() || self.usages.contains(&usage)
    }

    /// The provider's native handle
    pub fn handle(&self) -> &Jwk {
        &self.handle
    }
}

/// Public and private halves of a generated key
#[derive(Clone, Debug)]
pub struct CryptoKeyPair {
    /// Public half (always extractable)
    pub public_key: CryptoKey,
    /// Private half
    pub private_key: CryptoKey,
}

impl CryptoKeyPair {
    /// Split a freshly generated private JWK into both halves
    ///
    /// Usages are divided between the halves: the public key gets verify,
    /// encrypt and wrap; the private key gets the rest.
    pub fn from_private_jwk(
        jwk: Jwk,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Self {
        let public_usage = |op: &&KeyOperation| {
            matches!(
                op,
                KeyOperation::Verify | KeyOperation::Encrypt | KeyOperation::WrapKey
            )
        };
        let public_usages: Vec<KeyOperation> = usages.iter().filter(public_usage).copied().collect();
        let private_usages: Vec<KeyOperation> = usages
            .iter()
            .filter(|op| !public_usage(op))
            .copied()
            .collect();

        Self {
            public_key: CryptoKey::new(jwk.to_public(), algorithm.clone(), true, &public_usages),
            private_key: CryptoKey::new(jwk, algorithm.clone(), extractable, &private_usages),
        }
    }
}

/// One family of cryptographic primitives
pub trait Provider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Import a JWK into a native key handle
    fn import_key(
        &self,
        jwk: &Jwk,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyOperation],
    ) -> Result<CryptoKey> {
        jwk.validate()?;
        Ok(CryptoKey::new(jwk.clone(), algorithm.clone(), extractable, usages))
    }

    /// Export a native key handle as a JWK
    ///
    /// Public keys are always exportable; private and secret keys only when
    /// imported or generated as extractable.
    fn export_key_jwk(&self, key: &CryptoKey) -> Result<Jwk> {
        if key.kind() != CryptoKeyKind::Public && !key.extractable() {
            return Err(Error::KeyNotExtractable);
        }
        Ok(key.handle().clone())
    }

    /// Generate a key pair
    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        _extractable: bool,
        _usages: &[KeyOperation],
    ) -> Result<CryptoKeyPair> {
        Err(unsupported(self.name(), "generate_key_pair", algorithm))
    }

    /// Produce a signature or MAC
    fn sign(&self, algorithm: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(self.name(), "sign", algorithm))
    }

    /// Check a signature or MAC; `Ok(false)` when it does not match
    fn verify(
        &self,
        algorithm: &Algorithm,
        _key: &CryptoKey,
        _data: &[u8],
        _signature: &[u8],
    ) -> Result<bool> {
        Err(unsupported(self.name(), "verify", algorithm))
    }

    /// Hash data
    fn digest(&self, algorithm: &Algorithm, _data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(self.name(), "digest", algorithm))
    }

    /// Encrypt data (content or a wrapped key)
    fn encrypt(&self, algorithm: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(self.name(), "encrypt", algorithm))
    }

    /// Decrypt data (content or a wrapped key)
    fn decrypt(&self, algorithm: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(self.name(), "decrypt", algorithm))
    }

    /// Key agreement: raw shared secret between a private and a public key
    fn derive_bits(
        &self,
        algorithm: &Algorithm,
        _private_key: &CryptoKey,
        _public_key: &CryptoKey,
    ) -> Result<Vec<u8>> {
        Err(unsupported(self.name(), "derive_bits", algorithm))
    }
}

fn unsupported(provider: &str, operation: &str, algorithm: &Algorithm) -> Error {
    Error::UnsupportedOperation(format!(
        "{} does not implement {} for {}",
        provider, operation, algorithm.name
    ))
}

/// Fetch the private or secret handle a primitive needs
pub(crate) fn require_kind(key: &CryptoKey, kind: CryptoKeyKind, usage: KeyOperation) -> Result<&Jwk> {
    if key.kind() != kind {
        return Err(Error::InvalidKey(format!(
            "Expected a {:?} key, got {:?}",
            kind,
            key.kind()
        )));
    }
    if !key.allows(usage) {
        return Err(Error::InvalidKey(format!("Key usage {:?} not permitted", usage)));
    }
    Ok(key.handle())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvider;

    impl Provider for NullProvider {
        fn name(&self) -> &str {
            "null"
        }
    }

    fn secret_jwk() -> Jwk {
        Jwk::from_json(r#"{"kty":"oct","k":"AAEC"}"#).unwrap()
    }

    #[test]
    fn test_defaults_are_unsupported() {
        let provider = NullProvider;
        let alg = Algorithm::new("HS256");
        let key = provider.import_key(&secret_jwk(), &alg, true, &[]).unwrap();

        let err = provider.sign(&alg, &key, b"data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_export_respects_extractable() {
        let provider = NullProvider;
        let alg = Algorithm::new("HS256");

        let sealed = provider.import_key(&secret_jwk(), &alg, false, &[]).unwrap();
        assert!(matches!(
            provider.export_key_jwk(&sealed),
            Err(Error::KeyNotExtractable)
        ));

        let open = provider.import_key(&secret_jwk(), &alg, true, &[]).unwrap();
        assert_eq!(provider.export_key_jwk(&open).unwrap(), secret_jwk());
    }

    #[test]
    fn test_usage_check() {
        let alg = Algorithm::new("HS256");
        let key = CryptoKey::new(secret_jwk(), alg, true, &[KeyOperation::Verify]);

        assert!(require_kind(&key, CryptoKeyKind::Secret, KeyOperation::Verify).is_ok());
        assert!(require_kind(&key, CryptoKeyKind::Secret, KeyOperation::Sign).is_err());
        assert!(require_kind(&key, CryptoKeyKind::Private, KeyOperation::Verify).is_err());
    }
}
