//! # Provider Registry
//!
//! Maps `(family, algorithm name, scope)` to a [`Provider`]. Each
//! [`CryptoEngine`](crate::crypto::CryptoEngine) owns its registry.
//!
//! ## Resolution
//!
//! ```text
//! get_signer("ES256K", PublicOnly)
//!     │
//!     ├── entry registered with scope PublicOnly?  ──► use it
//!     ├── entry registered with scope All?         ──► use it
//!     └── otherwise                                ──► NoProviderForAlgorithm
//! ```
//!
//! Names are matched case-insensitively. When two providers are registered
//! for the same name and scope, the later registration wins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crypto::algorithm::names;
use crate::crypto::provider::{Provider, ProviderScope};
use crate::crypto::software;
use crate::error::{Error, Result};

/// The kind of operation a provider is registered for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// Asymmetric signatures
    Signer,
    /// MACs over a secret key
    MacSigner,
    /// Hash functions
    Digest,
    /// Key wrapping and key agreement (`alg` of a JWE)
    SharedKeyEncrypter,
    /// Content encryption (`enc` of a JWE)
    SymmetricEncrypter,
}

type Entry = (ProviderScope, Arc<dyn Provider>);

/// Registry of providers by family, algorithm and scope
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    entries: HashMap<(ProviderFamily, String), Vec<Entry>>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in software providers, all with scope
    /// [`ProviderScope::All`]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let all = ProviderScope::All;

        let ecdsa = Arc::new(software::EcdsaProvider);
        let eddsa = Arc::new(software::EddsaProvider);
        let rsa = Arc::new(software::RsaProvider);
        let hmac = Arc::new(software::HmacProvider);
        let digest = Arc::new(software::DigestProvider);
        let ecdh = Arc::new(software::EcdhProvider);
        let aes = Arc::new(software::AesProvider);
        let pbes2 = Arc::new(software::Pbes2Provider);

        registry.add_signer(names::ES256K, ecdsa, all);
        registry.add_signer(names::EDDSA, eddsa, all);
        for alg in [names::RS256, names::RS384, names::RS512, names::PS256] {
            registry.add_signer(alg, rsa.clone(), all);
        }
        for alg in [names::HS256, names::HS384, names::HS512] {
            registry.add_mac_signer(alg, hmac.clone(), all);
        }
        for alg in [names::SHA256, names::SHA384, names::SHA512] {
            registry.add_digest(alg, digest.clone(), all);
        }

        for alg in [names::RSA_OAEP, names::RSA_OAEP_256] {
            registry.add_shared_key_encrypter(alg, rsa.clone(), all);
        }
        registry.add_shared_key_encrypter(names::ECDH_ES, ecdh, all);
        for alg in [names::A128KW, names::A256KW] {
            registry.add_shared_key_encrypter(alg, aes.clone(), all);
        }
        for alg in [names::PBES2_HS256_A128KW, names::PBES2_HS512_A256KW] {
            registry.add_shared_key_encrypter(alg, pbes2.clone(), all);
        }

        for alg in [names::A128GCM, names::A256GCM] {
            registry.add_symmetric_encrypter(alg, aes.clone(), all);
        }

        registry
    }

    /// Register a provider
    pub fn add(
        &mut self,
        family: ProviderFamily,
        name: &str,
        provider: Arc<dyn Provider>,
        scope: ProviderScope,
    ) {
        tracing::debug!(
            "Registering {} for {:?} {} (scope {})",
            provider.name(),
            family,
            name,
            scope
        );
        self.entries
            .entry((family, normalize(name)))
            .or_default()
            .push((scope, provider));
    }

    /// Resolve a provider
    pub fn get(
        &self,
        family: ProviderFamily,
        name: &str,
        scope: ProviderScope,
    ) -> Result<Arc<dyn Provider>> {
        let entries = self.entries.get(&(family, normalize(name)));
        let pick = |wanted: ProviderScope| {
            entries.and_then(|list| {
                list.iter()
                    .rev()
                    .find(|(registered, _)| *registered == wanted)
                    .map(|(_, provider)| provider.clone())
            })
        };

        pick(scope)
            .or_else(|| pick(ProviderScope::All))
            .ok_or_else(|| {
                tracing::warn!("No {:?} provider for {} with scope {}", family, name, scope);
                Error::NoProviderForAlgorithm {
                    algorithm: name.to_string(),
                    scope: scope.to_string(),
                }
            })
    }

    /// Register a signature provider
    pub fn add_signer(&mut self, name: &str, provider: Arc<dyn Provider>, scope: ProviderScope) {
        self.add(ProviderFamily::Signer, name, provider, scope);
    }

    /// Register a MAC provider
    pub fn add_mac_signer(&mut self, name: &str, provider: Arc<dyn Provider>, scope: ProviderScope) {
        self.add(ProviderFamily::MacSigner, name, provider, scope);
    }

    /// Register a digest provider
    pub fn add_digest(&mut self, name: &str, provider: Arc<dyn Provider>, scope: ProviderScope) {
        self.add(ProviderFamily::Digest, name, provider, scope);
    }

    /// Register a key-wrap / key-agreement provider
    pub fn add_shared_key_encrypter(
        &mut self,
        name: &str,
        provider: Arc<dyn Provider>,
        scope: ProviderScope,
    ) {
        self.add(ProviderFamily::SharedKeyEncrypter, name, provider, scope);
    }

    /// Register a content-encryption provider
    pub fn add_symmetric_encrypter(
        &mut self,
        name: &str,
        provider: Arc<dyn Provider>,
        scope: ProviderScope,
    ) {
        self.add(ProviderFamily::SymmetricEncrypter, name, provider, scope);
    }

    /// Resolve a signature provider
    pub fn get_signer(&self, name: &str, scope: ProviderScope) -> Result<Arc<dyn Provider>> {
        self.get(ProviderFamily::Signer, name, scope)
    }

    /// Resolve a MAC provider
    pub fn get_mac_signer(&self, name: &str, scope: ProviderScope) -> Result<Arc<dyn Provider>> {
        self.get(ProviderFamily::MacSigner, name, scope)
    }

    /// Resolve a digest provider
    pub fn get_digest(&self, name: &str, scope: ProviderScope) -> Result<Arc<dyn Provider>> {
        self.get(ProviderFamily::Digest, name, scope)
    }

    /// Resolve a key-wrap / key-agreement provider
    pub fn get_shared_key_encrypter(
        &self,
        name: &str,
        scope: ProviderScope,
    ) -> Result<Arc<dyn Provider>> {
        self.get(ProviderFamily::SharedKeyEncrypter, name, scope)
    }

    /// Resolve a content-encryption provider
    pub fn get_symmetric_encrypter(
        &self,
        name: &str,
        scope: ProviderScope,
    ) -> Result<Arc<dyn Provider>> {
        self.get(ProviderFamily::SymmetricEncrypter, name, scope)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.entries.keys().map(|(fam, name)| format!("{:?}:{}", fam, name)).collect();
        names.sort();
        f.debug_struct("ProviderRegistry").field("entries", &names).finish()
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Provider for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_private_only_does_not_serve_public_requests() {
        let mut registry = ProviderRegistry::new();
        registry.add_signer("ES256K", Arc::new(Named("sealed")), ProviderScope::PrivateOnly);

        assert!(registry.get_signer("ES256K", ProviderScope::PrivateOnly).is_ok());
        let err = registry
            .get_signer("ES256K", ProviderScope::PublicOnly)
            .err()
            .unwrap();
        assert!(matches!(err, Error::NoProviderForAlgorithm { .. }));
    }

    #[test]
    fn test_exact_scope_beats_all() {
        let mut registry = ProviderRegistry::new();
        registry.add_signer("RS256", Arc::new(Named("generic")), ProviderScope::All);
        registry.add_signer("RS256", Arc::new(Named("hardware")), ProviderScope::PrivateOnly);

        let private = registry.get_signer("RS256", ProviderScope::PrivateOnly).unwrap();
        assert_eq!(private.name(), "hardware");

        let public = registry.get_signer("RS256", ProviderScope::PublicOnly).unwrap();
        assert_eq!(public.name(), "generic");
    }

    #[test]
    fn test_names_case_insensitive_and_later_wins() {
        let mut registry = ProviderRegistry::new();
        registry.add_digest("sha-256", Arc::new(Named("first")), ProviderScope::All);
        registry.add_digest("SHA-256", Arc::new(Named("second")), ProviderScope::All);

        let provider = registry.get_digest("Sha-256", ProviderScope::All).unwrap();
        assert_eq!(provider.name(), "second");
    }

    #[test]
    fn test_families_are_separate() {
        let mut registry = ProviderRegistry::new();
        registry.add_signer("HS256", Arc::new(Named("x")), ProviderScope::All);
        assert!(registry.get_mac_signer("HS256", ProviderScope::All).is_err());
    }

    #[test]
    fn test_defaults_cover_jose_algorithms() {
        let registry = ProviderRegistry::with_defaults();
        let any = ProviderScope::PublicOnly;

        assert!(registry.get_signer("ES256K", any).is_ok());
        assert!(registry.get_signer("EdDSA", any).is_ok());
        assert!(registry.get_signer("PS256", any).is_ok());
        assert!(registry.get_mac_signer("HS512", any).is_ok());
        assert!(registry.get_digest("SHA-384", any).is_ok());
        assert!(registry.get_shared_key_encrypter("RSA-OAEP-256", any).is_ok());
        assert!(registry.get_shared_key_encrypter("PBES2-HS512+A256KW", any).is_ok());
        assert!(registry.get_symmetric_encrypter("A256GCM", any).is_ok());
        assert!(registry.get_signer("ES256", any).is_err());
    }
}
