//! # JSON Web Key (JWK)
//!
//! A JWK ([RFC7517]) is the JSON form of every key this crate handles. It is
//! pure data: the typed [`Key`](super::Key) variants are built from it and
//! converted back to it without losing any populated field.
//!
//! ## Field Consistency
//!
//! | kty | required | optional private | forbidden |
//! |-----|----------|------------------|-----------|
//! | EC  | crv, x, y | d | n, e, k, RSA private fields |
//! | RSA | n, e | d, p, q, dp, dq, qi, oth | crv, x, y, k |
//! | OKP | crv, x | d | y, n, e, k, RSA private fields |
//! | oct | k | | everything else |
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encoding::b64url_encode;
use crate::error::{Error, Result};

/// Key type (`kty`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Elliptic curve (secp256k1)
    #[serde(rename = "EC")]
    Ec,
    /// RSA
    #[serde(rename = "RSA")]
    Rsa,
    /// Octet key pair (Ed25519 / X25519)
    #[serde(rename = "OKP")]
    Okp,
    /// Symmetric octet sequence
    #[serde(rename = "oct")]
    Oct,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyType::Ec => "EC",
            KeyType::Rsa => "RSA",
            KeyType::Okp => "OKP",
            KeyType::Oct => "oct",
        };
        f.write_str(name)
    }
}

/// Intended use of the public key (`use`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUse {
    /// Signature
    #[serde(rename = "sig")]
    Signature,
    /// Encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// Permitted key operation (`key_ops`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    /// Compute a signature or MAC
    Sign,
    /// Verify a signature or MAC
    Verify,
    /// Encrypt content
    Encrypt,
    /// Decrypt content
    Decrypt,
    /// Encrypt a key
    WrapKey,
    /// Decrypt a key
    UnwrapKey,
    /// Derive a key
    DeriveKey,
    /// Derive bits not used as a key
    DeriveBits,
}

/// Additional prime for multi-prime RSA (`oth`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherPrimeInfo {
    /// Prime factor
    pub r: String,
    /// Factor CRT exponent
    pub d: String,
    /// Factor CRT coefficient
    pub t: String,
}

/// JSON Web Key with every standard member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type
    pub kty: KeyType,

    /// Key identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public key use
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// Permitted operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyOperation>>,

    /// Intended algorithm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Curve name (EC, OKP)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// X coordinate (EC) or public key (OKP)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Y coordinate (EC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private scalar (EC, OKP) or private exponent (RSA)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA modulus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// RSA first prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// RSA second prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// RSA first factor CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// RSA second factor CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// RSA first CRT coefficient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    /// RSA other primes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oth: Option<Vec<OtherPrimeInfo>>,

    /// Symmetric key value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    /// An empty JWK of the given type
    pub fn new(kty: KeyType) -> Self {
        Self {
            kty,
            kid: None,
            use_: None,
            key_ops: None,
            alg: None,
            crv: None,
            x: None,
            y: None,
            d: None,
            n: None,
            e: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            oth: None,
            k: None,
        }
    }

    /// Parse a JWK from its JSON form and check field consistency
    pub fn from_json(json: &str) -> Result<Self> {
        let jwk: Jwk = serde_json::from_str(json)?;
        jwk.validate()?;
        Ok(jwk)
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether the JWK carries private material
    pub fn is_private(&self) -> bool {
        match self.kty {
            KeyType::Oct => false,
            _ => self.d.is_some(),
        }
    }

    /// Check that the present fields match `kty`
    pub fn validate(&self) -> Result<()> {
        let rsa_private = [&self.p, &self.q, &self.dp, &self.dq, &self.qi];
        let has_rsa_private = rsa_private.iter().any(|f| f.is_some()) || self.oth.is_some();

        match self.kty {
            KeyType::Ec => {
                require(self, "crv", &self.crv)?;
                require(self, "x", &self.x)?;
                require(self, "y", &self.y)?;
                forbid(self, "n", self.n.is_some())?;
                forbid(self, "e", self.e.is_some())?;
                forbid(self, "k", self.k.is_some())?;
                forbid(self, "RSA private fields", has_rsa_private)?;
            }
            KeyType::Rsa => {
                require(self, "n", &self.n)?;
                require(self, "e", &self.e)?;
                forbid(self, "crv", self.crv.is_some())?;
                forbid(self, "x", self.x.is_some())?;
                forbid(self, "y", self.y.is_some())?;
                forbid(self, "k", self.k.is_some())?;
                if has_rsa_private && self.d.is_none() {
                    return Err(Error::InvalidKey(
                        "RSA JWK has prime factors but no private exponent".into(),
                    ));
                }
            }
            KeyType::Okp => {
                require(self, "crv", &self.crv)?;
                require(self, "x", &self.x)?;
                forbid(self, "y", self.y.is_some())?;
                forbid(self, "n", self.n.is_some())?;
                forbid(self, "e", self.e.is_some())?;
                forbid(self, "k", self.k.is_some())?;
                forbid(self, "RSA private fields", has_rsa_private)?;
            }
            KeyType::Oct => {
                require(self, "k", &self.k)?;
                let foreign = [
                    &self.crv, &self.x, &self.y, &self.d, &self.n, &self.e,
                ]
                .iter()
                .any(|f| f.is_some());
                forbid(self, "asymmetric fields", foreign || has_rsa_private)?;
            }
        }
        Ok(())
    }

    /// Copy of this JWK with all private members removed
    pub fn to_public(&self) -> Self {
        let mut public = self.clone();
        public.d = None;
        public.p = None;
        public.q = None;
        public.dp = None;
        public.dq = None;
        public.qi = None;
        public.oth = None;
        public
    }

    /// RFC 7638 JWK thumbprint (SHA-256, base64url)
    ///
    /// Only the required members, in lexicographic order, with no
    /// whitespace. Used as the `kid` of generated and derived keys.
    pub fn thumbprint(&self) -> Result<String> {
        let members: Vec<(&str, &Option<String>)> = match self.kty {
            KeyType::Ec => vec![("crv", &self.crv), ("x", &self.x), ("y", &self.y)],
            KeyType::Rsa => vec![("e", &self.e), ("n", &self.n)],
            KeyType::Okp => vec![("crv", &self.crv), ("x", &self.x)],
            KeyType::Oct => vec![("k", &self.k)],
        };

        // "kty" lands at a different position per key type
        let kty = self.kty.to_string();
        let mut fields: Vec<(&str, &str)> = vec![("kty", kty.as_str())];
        for (name, value) in members {
            let value = value.as_deref().ok_or_else(|| {
                Error::InvalidKey(format!("{} JWK missing '{}' for thumbprint", self.kty, name))
            })?;
            fields.push((name, value));
        }
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let body = fields
            .iter()
            .map(|(name, value)| {
                Ok(format!(
                    "{}:{}",
                    serde_json::to_string(name)?,
                    serde_json::to_string(value)?
                ))
            })
            .collect::<Result<Vec<_>>>()?
            .join(",");

        let digest = Sha256::digest(format!("{{{}}}", body).as_bytes());
        Ok(b64url_encode(digest))
    }
}

fn require(jwk: &Jwk, name: &str, field: &Option<String>) -> Result<()> {
    if field.is_none() {
        return Err(Error::InvalidKey(format!("{} JWK missing '{}'", jwk.kty, name)));
    }
    Ok(())
}

fn forbid(jwk: &Jwk, name: &str, present: bool) -> Result<()> {
    if present {
        return Err(Error::InvalidKey(format!("{} JWK must not carry {}", jwk.kty, name)));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7638_thumbprint() {
        // RFC 7638 section 3.1 example key
        let jwk = Jwk::from_json(
            r#"{"kty":"RSA","e":"AQAB","alg":"RS256","kid":"2011-04-29","n":"0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw"}"#,
        )
        .unwrap();

        assert_eq!(
            jwk.thumbprint().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_absent_fields_not_serialized() {
        let mut jwk = Jwk::new(KeyType::Oct);
        jwk.k = Some("c2VjcmV0".into());
        assert_eq!(jwk.to_json().unwrap(), r#"{"kty":"oct","k":"c2VjcmV0"}"#);
    }

    #[test]
    fn test_use_and_key_ops_names() {
        let jwk = Jwk::from_json(
            r#"{"kty":"EC","crv":"secp256k1","x":"AA","y":"AA","use":"sig","key_ops":["sign","wrapKey"]}"#,
        )
        .unwrap();
        assert_eq!(jwk.use_, Some(KeyUse::Signature));
        assert_eq!(
            jwk.key_ops,
            Some(vec![KeyOperation::Sign, KeyOperation::WrapKey])
        );
        let json = jwk.to_json().unwrap();
        assert!(json.contains(r#""use":"sig""#));
        assert!(json.contains(r#""wrapKey""#));
    }

    #[test]
    fn test_inconsistent_fields_rejected() {
        assert!(Jwk::from_json(r#"{"kty":"oct","k":"AA","x":"AA"}"#).is_err());
        assert!(Jwk::from_json(r#"{"kty":"EC","crv":"secp256k1","x":"AA"}"#).is_err());
        assert!(Jwk::from_json(r#"{"kty":"RSA","n":"AA","e":"AQAB","p":"AA"}"#).is_err());
        assert!(Jwk::from_json(r#"{"kty":"OKP","crv":"Ed25519","x":"AA","y":"AA"}"#).is_err());
    }

    #[test]
    fn test_to_public_strips_private_members() {
        let jwk = Jwk::from_json(
            r#"{"kty":"RSA","n":"AQ","e":"AQAB","d":"AQ","p":"AQ","q":"AQ","dp":"AQ","dq":"AQ","qi":"AQ"}"#,
        )
        .unwrap();
        assert!(jwk.is_private());
        let public = jwk.to_public();
        assert!(!public.is_private());
        assert_eq!(public.to_json().unwrap(), r#"{"kty":"RSA","n":"AQ","e":"AQAB"}"#);
    }
}
