//! # Key Store
//!
//! Named, versioned storage for secret, private and public keys.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           KEY STORE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  reference ──► KeyContainer { kty, use, alg, [v1, v2, ... vN] }        │
//! │                                                   ▲                     │
//! │                                                   └── latest()          │
//! │                                                                         │
//! │  secret  : "mac"            ──► [oct, oct]                             │
//! │  private : "did.peer"       ──► [EC]                                   │
//! │  public  : (none stored)    ──► derived from private on demand         │
//! │                                                                         │
//! │  kid index : kid ──► (kind, reference)                                 │
//! │                                                                         │
//! │  save() only appends; rotating a key keeps older versions              │
//! │  resolvable by kid so old signatures still verify.                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod memory;

pub use memory::InMemoryKeyStore;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::keys::{Key, KeyContainer, KeyType, PrivateKey, PublicKey, SecretKey};

/// One entry of [`KeyStore::list`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyListEntry {
    /// Key type of the reference
    pub kty: KeyType,
    /// Kids under the reference, newest first
    pub kids: Vec<String>,
}

/// Storage for keys by reference
///
/// Implementations must be safe to share across threads; the crypto engine
/// holds the store behind an `Arc`.
pub trait KeyStore: Send + Sync {
    /// Secret key versions under `reference`
    fn get_secret_key(&self, reference: &str) -> Result<KeyContainer<SecretKey>>;

    /// Private key versions under `reference`
    fn get_private_key(&self, reference: &str) -> Result<KeyContainer<PrivateKey>>;

    /// Public key versions under `reference`
    ///
    /// When only private keys are stored under `reference`, their public
    /// keys are returned in the same order with the same kids.
    fn get_public_key(&self, reference: &str) -> Result<KeyContainer<PublicKey>>;

    /// Secret key with `kid`, in any container
    fn get_secret_key_by_id(&self, kid: &str) -> Result<Option<SecretKey>>;

    /// Private key with `kid`, in any container
    fn get_private_key_by_id(&self, kid: &str) -> Result<Option<PrivateKey>>;

    /// Public key with `kid`, derived from a private key when needed
    fn get_public_key_by_id(&self, kid: &str) -> Result<Option<PublicKey>>;

    /// Append a key version under `reference`
    fn save(&self, reference: &str, key: Key) -> Result<()>;

    /// Every reference with its key type and kids
    fn list(&self) -> Result<BTreeMap<String, KeyListEntry>>;

    /// Any key with `kid`: private first, then secret, then public
    fn get_key_by_id(&self, kid: &str) -> Result<Option<Key>> {
        if let Some(key) = self.get_private_key_by_id(kid)? {
            return Ok(Some(Key::Private(key)));
        }
        if let Some(key) = self.get_secret_key_by_id(kid)? {
            return Ok(Some(Key::Secret(key)));
        }
        Ok(self.get_public_key_by_id(kid)?.map(Key::Public))
    }
}
