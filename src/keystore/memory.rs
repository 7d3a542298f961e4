//! In-memory key store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{KeyListEntry, KeyStore};
use crate::error::{Error, Result};
use crate::keys::{Key, KeyContainer, KeyVersion, PrivateKey, PublicKey, SecretKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Kind {
    Secret,
    Private,
    Public,
}

#[derive(Default)]
struct Inner {
    secret: HashMap<String, KeyContainer<SecretKey>>,
    private: HashMap<String, KeyContainer<PrivateKey>>,
    public: HashMap<String, KeyContainer<PublicKey>>,
    /// (kind, kid) -> reference
    kids: HashMap<(Kind, String), String>,
}

/// Key store held in process memory
///
/// One lock guards every map, so a save is atomic with respect to readers
/// and concurrent saves are serialized.
#[derive(Default)]
pub struct InMemoryKeyStore {
    inner: RwLock<Inner>,
}

impl InMemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("InMemoryKeyStore")
            .field("secret", &inner.secret.len())
            .field("private", &inner.private.len())
            .field("public", &inner.public.len())
            .finish()
    }
}

fn append<T: KeyVersion>(
    map: &mut HashMap<String, KeyContainer<T>>,
    reference: &str,
    key: T,
) -> Result<()> {
    match map.get_mut(reference) {
        Some(container) => {
            if container.kty() != key.kty() {
                return Err(Error::InvalidKey(format!(
                    "Reference '{}' holds {} keys, cannot add a {} key",
                    reference,
                    container.kty(),
                    key.kty()
                )));
            }
            container.push(key);
        }
        None => {
            map.insert(reference.to_string(), KeyContainer::new(key));
        }
    }
    Ok(())
}

fn not_found(reference: &str) -> Error {
    Error::KeyNotFound(reference.to_string())
}

impl Inner {
    fn find<'a, T: KeyVersion>(
        &self,
        map: &'a HashMap<String, KeyContainer<T>>,
        kind: Kind,
        kid: &str,
    ) -> Option<&'a T> {
        let reference = self.kids.get(&(kind, kid.to_string()))?;
        map.get(reference)?.get(Some(kid))
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get_secret_key(&self, reference: &str) -> Result<KeyContainer<SecretKey>> {
        let inner = self.inner.read();
        inner.secret.get(reference).cloned().ok_or_else(|| not_found(reference))
    }

    fn get_private_key(&self, reference: &str) -> Result<KeyContainer<PrivateKey>> {
        let inner = self.inner.read();
        inner.private.get(reference).cloned().ok_or_else(|| not_found(reference))
    }

    fn get_public_key(&self, reference: &str) -> Result<KeyContainer<PublicKey>> {
        let inner = self.inner.read();
        if let Some(container) = inner.public.get(reference) {
            return Ok(container.clone());
        }
        // derived on every call, never cached
        inner
            .private
            .get(reference)
            .map(|container| container.map(PrivateKey::public_key))
            .ok_or_else(|| not_found(reference))
    }

    fn get_secret_key_by_id(&self, kid: &str) -> Result<Option<SecretKey>> {
        let inner = self.inner.read();
        Ok(inner.find(&inner.secret, Kind::Secret, kid).cloned())
    }

    fn get_private_key_by_id(&self, kid: &str) -> Result<Option<PrivateKey>> {
        let inner = self.inner.read();
        Ok(inner.find(&inner.private, Kind::Private, kid).cloned())
    }

    fn get_public_key_by_id(&self, kid: &str) -> Result<Option<PublicKey>> {
        let inner = self.inner.read();
        if let Some(key) = inner.find(&inner.public, Kind::Public, kid) {
            return Ok(Some(key.clone()));
        }
        Ok(inner
            .find(&inner.private, Kind::Private, kid)
            .map(PrivateKey::public_key))
    }

    fn save(&self, reference: &str, key: Key) -> Result<()> {
        let kid = key.kid().map(str::to_string);
        let kty = key.kty();
        let mut inner = self.inner.write();

        let kind = match key {
            Key::Secret(key) => {
                append(&mut inner.secret, reference, key)?;
                Kind::Secret
            }
            Key::Private(key) => {
                append(&mut inner.private, reference, key)?;
                Kind::Private
            }
            Key::Public(key) => {
                append(&mut inner.public, reference, key)?;
                Kind::Public
            }
        };
        if let Some(kid) = &kid {
            inner
                .kids
                .entry((kind, kid.clone()))
                .or_insert_with(|| reference.to_string());
        }

        tracing::debug!(
            "Saved {:?} {} key under '{}' (kid {})",
            kind,
            kty,
            reference,
            kid.as_deref().unwrap_or("none")
        );
        Ok(())
    }

    fn list(&self) -> Result<BTreeMap<String, KeyListEntry>> {
        let inner = self.inner.read();
        let mut entries = BTreeMap::new();

        // later inserts win: private over secret over public
        for (reference, container) in &inner.public {
            entries.insert(reference.clone(), entry(container));
        }
        for (reference, container) in &inner.secret {
            entries.insert(reference.clone(), entry(container));
        }
        for (reference, container) in &inner.private {
            entries.insert(reference.clone(), entry(container));
        }
        Ok(entries)
    }
}

fn entry<T: KeyVersion>(container: &KeyContainer<T>) -> KeyListEntry {
    KeyListEntry {
        kty: container.kty(),
        kids: container.kids(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Jwk, KeyMetadata, KeyType};

    const EC_PRIVATE: &str = r#"{"kty":"EC","kid":"ec-1","crv":"secp256k1","x":"Y1sj6EAp9Wy6ObZ6ygZPBOVv7J1O8AtbZ2T-WfXmVWI","y":"5K1M7d0fM98QNpbnkZqRA_M8cAS7F1kxmpCmXSLBcZQ","d":"K6lZ4VA5dA-2ooTgCyBE9ad8EqOoHFS4IFc2Y82WlXA"}"#;

    fn secret(kid: &str, bytes: &[u8]) -> Key {
        let mut key = SecretKey::from_bytes(bytes.to_vec());
        key.metadata = KeyMetadata {
            kid: Some(kid.to_string()),
            ..KeyMetadata::default()
        };
        Key::Secret(key)
    }

    fn ec_private() -> Key {
        Key::from_jwk(&Jwk::from_json(EC_PRIVATE).unwrap()).unwrap()
    }

    #[test]
    fn test_versions_kept_latest_is_last() {
        let store = InMemoryKeyStore::new();
        store.save("mac", secret("v1", b"first")).unwrap();
        store.save("mac", secret("v2", b"second")).unwrap();

        let container = store.get_secret_key("mac").unwrap();
        assert_eq!(container.len(), 2);
        assert_eq!(container.latest().k.as_bytes(), b"second");

        let old = store.get_secret_key_by_id("v1").unwrap().unwrap();
        assert_eq!(old.k.as_bytes(), b"first");
    }

    #[test]
    fn test_missing_reference() {
        let store = InMemoryKeyStore::new();
        assert!(matches!(
            store.get_private_key("nope"),
            Err(Error::KeyNotFound(_))
        ));
        assert!(store.get_public_key_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_public_derived_from_private() {
        let store = InMemoryKeyStore::new();
        store.save("did", ec_private()).unwrap();

        let public = store.get_public_key("did").unwrap();
        assert_eq!(public.latest().kid(), Some("ec-1"));
        assert!(public.latest().to_jwk().d.is_none());

        let by_id = store.get_public_key_by_id("ec-1").unwrap().unwrap();
        assert_eq!(by_id, *public.latest());
    }

    #[test]
    fn test_kty_mismatch_rejected() {
        let store = InMemoryKeyStore::new();
        store.save("did", ec_private()).unwrap();

        let mut rsa = Jwk::new(KeyType::Rsa);
        rsa.n = Some("AQAB".into());
        rsa.e = Some("AQAB".into());
        rsa.d = Some("AQ".into());
        let err = store.save("did", Key::from_jwk(&rsa).unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_list_newest_first() {
        let store = InMemoryKeyStore::new();
        store.save("mac", secret("v1", b"a")).unwrap();
        store.save("mac", secret("v2", b"b")).unwrap();
        store.save("did", ec_private()).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list["mac"].kty, KeyType::Oct);
        assert_eq!(list["mac"].kids, vec!["v2".to_string(), "v1".to_string()]);
        assert_eq!(list["did"].kids, vec!["ec-1".to_string()]);
    }

    #[test]
    fn test_get_key_by_id_prefers_private() {
        let store = InMemoryKeyStore::new();
        store.save("did", ec_private()).unwrap();
        assert!(matches!(
            store.get_key_by_id("ec-1").unwrap(),
            Some(Key::Private(_))
        ));
    }

    #[test]
    fn test_concurrent_saves() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryKeyStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.save("shared", secret(&format!("k{}", i), b"x")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_secret_key("shared").unwrap().len(), 8);
    }
}
