//! # Persona Core
//!
//! Key management and JOSE cryptography for decentralized identities:
//! one master seed yields an unlinkable key per relationship, and those
//! keys sign (JWS) and encrypt (JWE) messages through a pluggable set of
//! crypto providers.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PERSONA CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐                     │
//! │  │    Seed     │  │  Pairwise   │  │    JOSE     │                     │
//! │  │             │  │             │  │             │                     │
//! │  │ - Generate  │─►│ - EC        │  │ - JWS       │                     │
//! │  │ - BIP39     │  │ - RSA       │  │ - JWE       │                     │
//! │  └─────────────┘  └──────┬──────┘  └──────┬──────┘                     │
//! │                          │                │                             │
//! │                          ▼                ▼                             │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        CryptoEngine                              │  │
//! │  │   sign / verify / encrypt / decrypt / derive_bits / digest       │  │
//! │  └──────────────┬─────────────────────────────────┬─────────────────┘  │
//! │                 │                                 │                     │
//! │  ┌──────────────▼──────────────┐  ┌───────────────▼─────────────────┐  │
//! │  │          KeyStore           │  │        ProviderRegistry         │  │
//! │  │                             │  │                                 │  │
//! │  │ - Versioned containers      │  │ - Algorithm → Provider          │  │
//! │  │ - Lookup by kid             │  │ - Public / private scope        │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Engine configuration
//! - [`encoding`] - Base64url helpers
//! - [`keys`] - JWKs, typed keys, versioned key containers
//! - [`keystore`] - Key storage by reference and kid
//! - [`crypto`] - Algorithms, providers, registry and the engine facade
//! - [`seed`] - Master seeds and BIP39 recovery phrases
//! - [`pairwise`] - Deterministic per-relationship keys
//! - [`jose`] - JWS and JWE tokens
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use persona_core::{CryptoEngine, InMemoryKeyStore, JwsToken, KeyType, PairwiseKeyGenerator};
//! use persona_core::jose::SerializationFormat;
//!
//! let engine = CryptoEngine::new(Arc::new(InMemoryKeyStore::new()));
//! let seed = engine.generate_seed();
//!
//! PairwiseKeyGenerator::new(&engine)
//!     .generate(&seed, "alice", "did:example:bob", KeyType::Ec)
//!     .unwrap();
//!
//! let mut token = JwsToken::new(b"hello bob".to_vec());
//! token.sign("alice.did:example:bob", &engine, None).unwrap();
//! let compact = token.serialize(SerializationFormat::Compact).unwrap();
//! assert_eq!(compact.split('.').count(), 3);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod jose;
pub mod keys;
pub mod keystore;
pub mod pairwise;
pub mod seed;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::EngineConfig;
pub use crypto::{Algorithm, CryptoEngine, Provider, ProviderRegistry, ProviderScope};
pub use error::{Error, Result};
pub use jose::{JweToken, JwsToken, SerializationFormat};
pub use keys::{Jwk, Key, KeyContainer, KeyType, KeyVersion, PrivateKey, PublicKey, SecretKey};
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use pairwise::PairwiseKeyGenerator;
pub use seed::{MasterSeed, RecoveryPhrase};

/// Returns the version of Persona Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
