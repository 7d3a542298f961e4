//! # Key Model
//!
//! Typed keys built from (and converted back to) [`Jwk`].
//!
//! ## Key Variants
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY VARIANTS                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Key::Private(PrivateKey) ──── public_key() ────► Key::Public(PublicKey)│
//! │      │                                               ▲                  │
//! │      │  EC  { crv, x, y, d }                         │  EC  { crv, x, y }│
//! │      │  RSA { n, e, d, p, q, dp, dq, qi, oth }       │  RSA { n, e }     │
//! │      │  OKP { crv, x, d }                            │  OKP { crv, x }   │
//! │      │                                               │                  │
//! │      └──────────── never the other way ──────────────┘                  │
//! │                                                                         │
//! │  Key::Secret(SecretKey)   oct { k }   (MAC keys, passwords)            │
//! │                                                                         │
//! │  Every variant carries KeyMetadata { kid, use, key_ops, alg }          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Key material is held as decoded bytes; secret bytes are zeroized on drop
//! and redacted from `Debug` output.

mod container;
mod jwk;

pub use container::KeyContainer;
pub use jwk::{Jwk, KeyOperation, KeyType, KeyUse, OtherPrimeInfo};

use zeroize::Zeroizing;

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{Error, Result};

/// Secret key bytes, zeroized on drop
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    /// Wrap raw secret bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Get the raw bytes
    ///
    /// ## Security Warning
    ///
    /// Never log or transmit these bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Prevent accidental logging
impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED; {}])", self.0.len())
    }
}

/// Metadata shared by every key variant
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Key identifier
    pub kid: Option<String>,
    /// Public key use
    pub use_: Option<KeyUse>,
    /// Permitted operations
    pub key_ops: Option<Vec<KeyOperation>>,
    /// Intended algorithm
    pub alg: Option<String>,
}

impl KeyMetadata {
    fn from_jwk(jwk: &Jwk) -> Self {
        Self {
            kid: jwk.kid.clone(),
            use_: jwk.use_,
            key_ops: jwk.key_ops.clone(),
            alg: jwk.alg.clone(),
        }
    }

    fn apply_to(&self, jwk: &mut Jwk) {
        jwk.kid = self.kid.clone();
        jwk.use_ = self.use_;
        jwk.key_ops = self.key_ops.clone();
        jwk.alg = self.alg.clone();
    }
}

/// Anything stored as a version inside a [`KeyContainer`]
pub trait KeyVersion: Clone {
    /// Shared metadata
    fn metadata(&self) -> &KeyMetadata;

    /// Key type
    fn kty(&self) -> KeyType;

    /// Key identifier
    fn kid(&self) -> Option<&str> {
        self.metadata().kid.as_deref()
    }
}

// ============================================================================
// PUBLIC KEYS
// ============================================================================

/// Public key material
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyMaterial {
    /// Elliptic curve point
    Ec {
        /// Curve name
        crv: String,
        /// X coordinate
        x: Vec<u8>,
        /// Y coordinate
        y: Vec<u8>,
    },
    /// RSA modulus and exponent
    Rsa {
        /// Modulus
        n: Vec<u8>,
        /// Public exponent
        e: Vec<u8>,
    },
    /// Octet key pair public key
    Okp {
        /// Curve name (Ed25519 / X25519)
        crv: String,
        /// Public key bytes
        x: Vec<u8>,
    },
}

/// A public key that can be shared with anyone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// Shared metadata
    pub metadata: KeyMetadata,
    /// Key material
    pub material: PublicKeyMaterial,
}

impl PublicKey {
    /// Build from a JWK (private members, if any, are ignored)
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        jwk.validate()?;
        let material = match jwk.kty {
            KeyType::Ec => PublicKeyMaterial::Ec {
                crv: field(jwk, "crv", &jwk.crv)?.to_string(),
                x: decode(jwk, "x", &jwk.x)?,
                y: decode(jwk, "y", &jwk.y)?,
            },
            KeyType::Rsa => PublicKeyMaterial::Rsa {
                n: decode(jwk, "n", &jwk.n)?,
                e: decode(jwk, "e", &jwk.e)?,
            },
            KeyType::Okp => PublicKeyMaterial::Okp {
                crv: field(jwk, "crv", &jwk.crv)?.to_string(),
                x: decode(jwk, "x", &jwk.x)?,
            },
            KeyType::Oct => {
                return Err(Error::InvalidKey("Symmetric JWK is not a public key".into()))
            }
        };
        Ok(Self {
            metadata: KeyMetadata::from_jwk(jwk),
            material,
        })
    }

    /// Convert to a JWK
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = Jwk::new(self.kty());
        self.metadata.apply_to(&mut jwk);
        match &self.material {
            PublicKeyMaterial::Ec { crv, x, y } => {
                jwk.crv = Some(crv.clone());
                jwk.x = Some(b64url_encode(x));
                jwk.y = Some(b64url_encode(y));
            }
            PublicKeyMaterial::Rsa { n, e } => {
                jwk.n = Some(b64url_encode(n));
                jwk.e = Some(b64url_encode(e));
            }
            PublicKeyMaterial::Okp { crv, x } => {
                jwk.crv = Some(crv.clone());
                jwk.x = Some(b64url_encode(x));
            }
        }
        jwk
    }

    /// Curve name for EC / OKP keys
    pub fn curve(&self) -> Option<&str> {
        match &self.material {
            PublicKeyMaterial::Ec { crv, .. } | PublicKeyMaterial::Okp { crv, .. } => Some(crv),
            PublicKeyMaterial::Rsa { .. } => None,
        }
    }
}

impl KeyVersion for PublicKey {
    fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    fn kty(&self) -> KeyType {
        match self.material {
            PublicKeyMaterial::Ec { .. } => KeyType::Ec,
            PublicKeyMaterial::Rsa { .. } => KeyType::Rsa,
            PublicKeyMaterial::Okp { .. } => KeyType::Okp,
        }
    }
}

// ============================================================================
// PRIVATE KEYS
// ============================================================================

/// RSA private key parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPrivateParts {
    /// Modulus
    pub n: Vec<u8>,
    /// Public exponent
    pub e: Vec<u8>,
    /// Private exponent
    pub d: SecretBytes,
    /// First prime factor
    pub p: Option<SecretBytes>,
    /// Second prime factor
    pub q: Option<SecretBytes>,
    /// First factor CRT exponent
    pub dp: Option<SecretBytes>,
    /// Second factor CRT exponent
    pub dq: Option<SecretBytes>,
    /// First CRT coefficient
    pub qi: Option<SecretBytes>,
    /// Additional primes, kept in their JWK form
    pub oth: Option<Vec<OtherPrimeInfo>>,
}

/// Private key material
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrivateKeyMaterial {
    /// Elliptic curve key
    Ec {
        /// Curve name
        crv: String,
        /// X coordinate
        x: Vec<u8>,
        /// Y coordinate
        y: Vec<u8>,
        /// Private scalar
        d: SecretBytes,
    },
    /// RSA key
    Rsa(RsaPrivateParts),
    /// Octet key pair
    Okp {
        /// Curve name
        crv: String,
        /// Public key bytes
        x: Vec<u8>,
        /// Private key bytes
        d: SecretBytes,
    },
}

/// A private key; always able to produce its public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateKey {
    /// Shared metadata
    pub metadata: KeyMetadata,
    /// Key material
    pub material: PrivateKeyMaterial,
}

impl PrivateKey {
    /// Build from a JWK carrying private members
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        jwk.validate()?;
        if !jwk.is_private() {
            return Err(Error::InvalidKey(format!(
                "{} JWK has no private member 'd'",
                jwk.kty
            )));
        }
        let material = match jwk.kty {
            KeyType::Ec => PrivateKeyMaterial::Ec {
                crv: field(jwk, "crv", &jwk.crv)?.to_string(),
                x: decode(jwk, "x", &jwk.x)?,
                y: decode(jwk, "y", &jwk.y)?,
                d: decode_secret(jwk, "d", &jwk.d)?,
            },
            KeyType::Rsa => PrivateKeyMaterial::Rsa(RsaPrivateParts {
                n: decode(jwk, "n", &jwk.n)?,
                e: decode(jwk, "e", &jwk.e)?,
                d: decode_secret(jwk, "d", &jwk.d)?,
                p: decode_optional_secret(&jwk.p)?,
                q: decode_optional_secret(&jwk.q)?,
                dp: decode_optional_secret(&jwk.dp)?,
                dq: decode_optional_secret(&jwk.dq)?,
                qi: decode_optional_secret(&jwk.qi)?,
                oth: jwk.oth.clone(),
            }),
            KeyType::Okp => PrivateKeyMaterial::Okp {
                crv: field(jwk, "crv", &jwk.crv)?.to_string(),
                x: decode(jwk, "x", &jwk.x)?,
                d: decode_secret(jwk, "d", &jwk.d)?,
            },
            KeyType::Oct => {
                return Err(Error::InvalidKey("Symmetric JWK is not a private key".into()))
            }
        };
        Ok(Self {
            metadata: KeyMetadata::from_jwk(jwk),
            material,
        })
    }

    /// Convert to a JWK including private members
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = self.public_key().to_jwk();
        match &self.material {
            PrivateKeyMaterial::Ec { d, .. } | PrivateKeyMaterial::Okp { d, .. } => {
                jwk.d = Some(b64url_encode(d.as_bytes()));
            }
            PrivateKeyMaterial::Rsa(parts) => {
                let encode = |v: &Option<SecretBytes>| v.as_ref().map(|b| b64url_encode(b.as_bytes()));
                jwk.d = Some(b64url_encode(parts.d.as_bytes()));
                jwk.p = encode(&parts.p);
                jwk.q = encode(&parts.q);
                jwk.dp = encode(&parts.dp);
                jwk.dq = encode(&parts.dq);
                jwk.qi = encode(&parts.qi);
                jwk.oth = parts.oth.clone();
            }
        }
        jwk
    }

    /// Derive the public key (same metadata, same kid)
    pub fn public_key(&self) -> PublicKey {
        let material = match &self.material {
            PrivateKeyMaterial::Ec { crv, x, y, .. } => PublicKeyMaterial::Ec {
                crv: crv.clone(),
                x: x.clone(),
                y: y.clone(),
            },
            PrivateKeyMaterial::Rsa(parts) => PublicKeyMaterial::Rsa {
                n: parts.n.clone(),
                e: parts.e.clone(),
            },
            PrivateKeyMaterial::Okp { crv, x, .. } => PublicKeyMaterial::Okp {
                crv: crv.clone(),
                x: x.clone(),
            },
        };
        PublicKey {
            metadata: self.metadata.clone(),
            material,
        }
    }
}

impl KeyVersion for PrivateKey {
    fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    fn kty(&self) -> KeyType {
        match self.material {
            PrivateKeyMaterial::Ec { .. } => KeyType::Ec,
            PrivateKeyMaterial::Rsa(_) => KeyType::Rsa,
            PrivateKeyMaterial::Okp { .. } => KeyType::Okp,
        }
    }
}

// ============================================================================
// SECRET KEYS
// ============================================================================

/// A symmetric key (`kty = "oct"`), also used to carry passwords
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    /// Shared metadata
    pub metadata: KeyMetadata,
    /// Key value
    pub k: SecretBytes,
}

impl SecretKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            metadata: KeyMetadata::default(),
            k: SecretBytes::new(bytes),
        }
    }

    /// Treat a password as raw key material (PBES2)
    pub fn from_password(password: &str) -> Self {
        Self::from_bytes(password.as_bytes().to_vec())
    }

    /// Build from an `oct` JWK
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        jwk.validate()?;
        if jwk.kty != KeyType::Oct {
            return Err(Error::InvalidKey(format!("{} JWK is not a secret key", jwk.kty)));
        }
        Ok(Self {
            metadata: KeyMetadata::from_jwk(jwk),
            k: decode_secret(jwk, "k", &jwk.k)?,
        })
    }

    /// Convert to a JWK
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = Jwk::new(KeyType::Oct);
        self.metadata.apply_to(&mut jwk);
        jwk.k = Some(b64url_encode(self.k.as_bytes()));
        jwk
    }
}

impl KeyVersion for SecretKey {
    fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    fn kty(&self) -> KeyType {
        KeyType::Oct
    }
}

// ============================================================================
// KEY
// ============================================================================

/// Any key, dispatched by variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    /// Public key
    Public(PublicKey),
    /// Private key
    Private(PrivateKey),
    /// Symmetric key
    Secret(SecretKey),
}

impl Key {
    /// Build the matching variant from a JWK
    ///
    /// `oct` becomes a secret key, a JWK with `d` a private key, anything
    /// else a public key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty == KeyType::Oct {
            Ok(Key::Secret(SecretKey::from_jwk(jwk)?))
        } else if jwk.is_private() {
            Ok(Key::Private(PrivateKey::from_jwk(jwk)?))
        } else {
            Ok(Key::Public(PublicKey::from_jwk(jwk)?))
        }
    }

    /// Convert to a JWK
    pub fn to_jwk(&self) -> Jwk {
        match self {
            Key::Public(key) => key.to_jwk(),
            Key::Private(key) => key.to_jwk(),
            Key::Secret(key) => key.to_jwk(),
        }
    }
}

impl KeyVersion for Key {
    fn metadata(&self) -> &KeyMetadata {
        match self {
            Key::Public(key) => key.metadata(),
            Key::Private(key) => key.metadata(),
            Key::Secret(key) => key.metadata(),
        }
    }

    fn kty(&self) -> KeyType {
        match self {
            Key::Public(key) => key.kty(),
            Key::Private(key) => key.kty(),
            Key::Secret(key) => key.kty(),
        }
    }
}

impl TryFrom<Jwk> for Key {
    type Error = Error;

    fn try_from(jwk: Jwk) -> Result<Self> {
        Key::from_jwk(&jwk)
    }
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Key::Public(key)
    }
}

impl From<PrivateKey> for Key {
    fn from(key: PrivateKey) -> Self {
        Key::Private(key)
    }
}

impl From<SecretKey> for Key {
    fn from(key: SecretKey) -> Self {
        Key::Secret(key)
    }
}

// ============================================================================
// JWK FIELD HELPERS
// ============================================================================

fn field<'a>(jwk: &Jwk, name: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::InvalidKey(format!("{} JWK missing '{}'", jwk.kty, name)))
}

fn decode(jwk: &Jwk, name: &str, value: &Option<String>) -> Result<Vec<u8>> {
    b64url_decode(field(jwk, name, value)?)
        .map_err(|e| Error::InvalidKey(format!("JWK member '{}': {}", name, e)))
}

fn decode_secret(jwk: &Jwk, name: &str, value: &Option<String>) -> Result<SecretBytes> {
    decode(jwk, name, value).map(SecretBytes::new)
}

fn decode_optional_secret(value: &Option<String>) -> Result<Option<SecretBytes>> {
    value
        .as_deref()
        .map(|v| {
            b64url_decode(v)
                .map(SecretBytes::new)
                .map_err(|e| Error::InvalidKey(format!("JWK member: {}", e)))
        })
        .transpose()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EC_PRIVATE: &str = r#"{"kty":"EC","kid":"ec-1","use":"sig","key_ops":["sign"],"alg":"ES256K","crv":"secp256k1","x":"Y1sj6EAp9Wy6ObZ6ygZPBOVv7J1O8AtbZ2T-WfXmVWI","y":"5K1M7d0fM98QNpbnkZqRA_M8cAS7F1kxmpCmXSLBcZQ","d":"K6lZ4VA5dA-2ooTgCyBE9ad8EqOoHFS4IFc2Y82WlXA"}"#;
    const RSA_PRIVATE: &str = r#"{"kty":"RSA","kid":"rsa-1","n":"AQAB","e":"AQAB","d":"AQ","p":"Aw","q":"BQ","dp":"AQ","dq":"AQ","qi":"Ag"}"#;
    const OKP_PUBLIC: &str = r#"{"kty":"OKP","crv":"Ed25519","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;
    const OCT: &str = r#"{"kty":"oct","kid":"mac","alg":"HS256","k":"c2VjcmV0LWtleS1ieXRlcw"}"#;

    fn roundtrip(json: &str) {
        let jwk = Jwk::from_json(json).unwrap();
        let key = Key::from_jwk(&jwk).unwrap();
        assert_eq!(key.to_jwk(), jwk);
        assert_eq!(key.to_jwk().to_json().unwrap(), json);
    }

    #[test]
    fn test_jwk_roundtrip_every_kty() {
        roundtrip(EC_PRIVATE);
        roundtrip(RSA_PRIVATE);
        roundtrip(OKP_PUBLIC);
        roundtrip(OCT);
    }

    #[test]
    fn test_variant_selection() {
        assert!(matches!(Key::from_jwk(&Jwk::from_json(EC_PRIVATE).unwrap()).unwrap(), Key::Private(_)));
        assert!(matches!(Key::from_jwk(&Jwk::from_json(OKP_PUBLIC).unwrap()).unwrap(), Key::Public(_)));
        assert!(matches!(Key::from_jwk(&Jwk::from_json(OCT).unwrap()).unwrap(), Key::Secret(_)));
    }

    #[test]
    fn test_private_derives_public_with_same_kid() {
        let private = PrivateKey::from_jwk(&Jwk::from_json(EC_PRIVATE).unwrap()).unwrap();
        let public = private.public_key();

        assert_eq!(public.kid(), Some("ec-1"));
        assert_eq!(public.kty(), KeyType::Ec);
        assert!(public.to_jwk().d.is_none());
        assert_eq!(public.to_jwk(), private.to_jwk().to_public());
    }

    #[test]
    fn test_public_jwk_is_not_private_key() {
        let jwk = Jwk::from_json(OKP_PUBLIC).unwrap();
        assert!(PrivateKey::from_jwk(&jwk).is_err());
        assert!(SecretKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_secret_bytes_redacted() {
        let key = SecretKey::from_password("hunter2");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    proptest! {
        #[test]
        fn test_oct_roundtrip_property(bytes in proptest::collection::vec(any::<u8>(), 1..64), kid in "[a-z0-9-]{1,16}") {
            let mut key = SecretKey::from_bytes(bytes.clone());
            key.metadata.kid = Some(kid.clone());
            let jwk = key.to_jwk();
            let restored = SecretKey::from_jwk(&jwk).unwrap();
            prop_assert_eq!(restored.k.as_bytes(), &bytes[..]);
            prop_assert_eq!(restored.kid(), Some(kid.as_str()));
        }
    }
}
