//! Key versions stored under one logical key reference.

use super::{KeyType, KeyUse, KeyVersion};

/// Ordered key versions under one key reference
///
/// Versions are only ever appended, so rotating a key keeps every earlier
/// version resolvable by its kid. The latest version is the most recently
/// appended one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyContainer<T> {
    kty: KeyType,
    use_: Option<KeyUse>,
    alg: Option<String>,
    keys: Vec<T>,
}

impl<T: KeyVersion> KeyContainer<T> {
    /// Start a container; shared metadata comes from the first version
    pub fn new(first: T) -> Self {
        Self {
            kty: first.kty(),
            use_: first.metadata().use_,
            alg: first.metadata().alg.clone(),
            keys: vec![first],
        }
    }

    /// Append a new version
    pub fn push(&mut self, key: T) {
        self.keys.push(key);
    }

    /// Key type shared by the versions
    pub fn kty(&self) -> KeyType {
        self.kty
    }

    /// Key use shared by the versions
    pub fn use_(&self) -> Option<KeyUse> {
        self.use_
    }

    /// Algorithm shared by the versions
    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// The most recently appended version
    pub fn latest(&self) -> &T {
        // containers are never empty: `new` takes the first version
        &self.keys[self.keys.len() - 1]
    }

    /// The version with `kid`, or the latest when `kid` is `None`
    pub fn get(&self, kid: Option<&str>) -> Option<&T> {
        match kid {
            None => Some(self.latest()),
            Some(kid) => self.keys.iter().find(|k| k.kid() == Some(kid)),
        }
    }

    /// All versions, oldest first
    pub fn keys(&self) -> &[T] {
        &self.keys
    }

    /// Known kids, newest first
    pub fn kids(&self) -> Vec<String> {
        self.keys
            .iter()
            .rev()
            .filter_map(|k| k.kid().map(str::to_string))
            .collect()
    }

    /// Number of versions
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; kept for the `len` convention
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Map every version, keeping order and shared metadata
    pub fn map<U, F>(&self, f: F) -> KeyContainer<U>
    where
        F: FnMut(&T) -> U,
    {
        KeyContainer {
            kty: self.kty,
            use_: self.use_,
            alg: self.alg.clone(),
            keys: self.keys.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMetadata, SecretKey};

    fn secret(kid: &str) -> SecretKey {
        let mut key = SecretKey::from_bytes(kid.as_bytes().to_vec());
        key.metadata = KeyMetadata {
            kid: Some(kid.to_string()),
            ..KeyMetadata::default()
        };
        key
    }

    #[test]
    fn test_latest_is_last_appended() {
        let mut container = KeyContainer::new(secret("v1"));
        container.push(secret("v2"));

        assert_eq!(container.len(), 2);
        assert_eq!(container.latest().kid(), Some("v2"));
        assert_eq!(container.get(None).unwrap().kid(), Some("v2"));
    }

    #[test]
    fn test_get_by_kid_any_position() {
        let mut container = KeyContainer::new(secret("v1"));
        container.push(secret("v2"));
        container.push(secret("v3"));

        assert_eq!(container.get(Some("v1")).unwrap().k.as_bytes(), b"v1");
        assert!(container.get(Some("v9")).is_none());
    }

    #[test]
    fn test_kids_newest_first() {
        let mut container = KeyContainer::new(secret("v1"));
        container.push(secret("v2"));
        assert_eq!(container.kids(), vec!["v2".to_string(), "v1".to_string()]);
    }
}
