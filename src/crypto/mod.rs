//! # Cryptography Module
//!
//! Algorithm descriptors, the provider seam, the registry that resolves
//! providers and the [`CryptoEngine`] facade on top.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  CryptoEngine                                                   │   │
//! │  │  sign / verify / encrypt / decrypt / generate_key_pair          │   │
//! │  └────────────┬──────────────────────────────┬─────────────────────┘   │
//! │               │ keys by reference            │ providers by name       │
//! │               ▼                              ▼                         │
//! │  ┌─────────────────────────┐   ┌───────────────────────────────────┐  │
//! │  │  KeyStore               │   │  ProviderRegistry                 │  │
//! │  │  (crate::keystore)      │   │  (family, alg, scope) → Provider  │  │
//! │  └─────────────────────────┘   └─────────────────┬─────────────────┘  │
//! │                                                  ▼                     │
//! │                                ┌───────────────────────────────────┐  │
//! │                                │  Provider                         │  │
//! │                                │  software::* or a platform store  │  │
//! │                                └───────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Default Algorithms
//!
//! | Purpose | Algorithm | Notes |
//! |---------|-----------|-------|
//! | DID signatures | ES256K | secp256k1, 64-byte `r ‖ s` |
//! | Device keys | EdDSA | Ed25519 |
//! | Legacy / pairwise RSA | RS256 | PKCS#1 v1.5 |
//! | MAC | HS256 / HS384 / HS512 | |
//! | JWE key management | ECDH-ES+A256KW, RSA-OAEP-256, PBES2-HS512+A256KW | by recipient key type |
//! | JWE content | A256GCM | 96-bit IV, 128-bit tag |

pub mod algorithm;
mod engine;
pub mod provider;
mod registry;
pub mod software;

pub use algorithm::Algorithm;
pub use engine::CryptoEngine;
pub use provider::{CryptoKey, CryptoKeyKind, CryptoKeyPair, Provider, ProviderScope};
pub use registry::{ProviderFamily, ProviderRegistry};
