//! Algorithm descriptors handed to providers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::{Jwk, KeyType};

/// Algorithm names understood by the default software providers
///
/// JOSE `alg` / `enc` names, plus digest names.
pub mod names {
    /// ECDSA on secp256k1 with SHA-256
    pub const ES256K: &str = "ES256K";
    /// Ed25519
    pub const EDDSA: &str = "EdDSA";
    /// RSASSA-PKCS1-v1_5 with SHA-256
    pub const RS256: &str = "RS256";
    /// RSASSA-PKCS1-v1_5 with SHA-384
    pub const RS384: &str = "RS384";
    /// RSASSA-PKCS1-v1_5 with SHA-512
    pub const RS512: &str = "RS512";
    /// RSASSA-PSS with SHA-256
    pub const PS256: &str = "PS256";
    /// HMAC with SHA-256
    pub const HS256: &str = "HS256";
    /// HMAC with SHA-384
    pub const HS384: &str = "HS384";
    /// HMAC with SHA-512
    pub const HS512: &str = "HS512";
    /// SHA-256 digest
    pub const SHA256: &str = "SHA-256";
    /// SHA-384 digest
    pub const SHA384: &str = "SHA-384";
    /// SHA-512 digest
    pub const SHA512: &str = "SHA-512";
    /// RSA-OAEP with SHA-1
    pub const RSA_OAEP: &str = "RSA-OAEP";
    /// RSA-OAEP with SHA-256
    pub const RSA_OAEP_256: &str = "RSA-OAEP-256";
    /// ECDH-ES key agreement (secp256k1 or X25519)
    pub const ECDH_ES: &str = "ECDH-ES";
    /// ECDH-ES with AES-128 key wrap
    pub const ECDH_ES_A128KW: &str = "ECDH-ES+A128KW";
    /// ECDH-ES with AES-256 key wrap
    pub const ECDH_ES_A256KW: &str = "ECDH-ES+A256KW";
    /// AES-128 key wrap
    pub const A128KW: &str = "A128KW";
    /// AES-256 key wrap
    pub const A256KW: &str = "A256KW";
    /// PBES2 with HMAC-SHA-256 and AES-128 key wrap
    pub const PBES2_HS256_A128KW: &str = "PBES2-HS256+A128KW";
    /// PBES2 with HMAC-SHA-512 and AES-256 key wrap
    pub const PBES2_HS512_A256KW: &str = "PBES2-HS512+A256KW";
    /// AES-128-GCM content encryption
    pub const A128GCM: &str = "A128GCM";
    /// AES-256-GCM content encryption
    pub const A256GCM: &str = "A256GCM";
}

/// Curve names
pub mod curves {
    /// secp256k1 (JOSE registered name)
    pub const SECP256K1: &str = "secp256k1";
    /// Alias used by older DID tooling
    pub const P256K: &str = "P-256K";
    /// Alias used by WebCrypto polyfills
    pub const K256: &str = "K-256";
    /// Ed25519 signatures
    pub const ED25519: &str = "Ed25519";
    /// X25519 key agreement
    pub const X25519: &str = "X25519";

    /// Whether `crv` names secp256k1
    pub fn is_secp256k1(crv: &str) -> bool {
        crv == SECP256K1 || crv == P256K || crv == K256
    }
}

/// Well-known parameter names inside [`Algorithm::params`]
pub mod params {
    /// RSA modulus length in bits
    pub const MODULUS_LENGTH: &str = "modulusLength";
    /// RSA public exponent
    pub const PUBLIC_EXPONENT: &str = "publicExponent";
    /// Hash name
    pub const HASH: &str = "hash";
    /// Named curve
    pub const NAMED_CURVE: &str = "namedCurve";
    /// Initialization vector (base64url)
    pub const IV: &str = "iv";
    /// Additional authenticated data (base64url)
    pub const ADDITIONAL_DATA: &str = "additionalData";
    /// PBES2 salt input (base64url)
    pub const SALT: &str = "p2s";
    /// PBES2 iteration count
    pub const ITERATIONS: &str = "p2c";
    /// Derived length in bits
    pub const LENGTH: &str = "length";
}

/// An algorithm name plus its parameters
///
/// Built per operation and never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    /// Algorithm name
    pub name: String,
    /// Algorithm parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Algorithm {
    /// Algorithm without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Get a parameter
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Get a string parameter
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    /// Get an integer parameter
    pub fn param_u64(&self, name: &str) -> Option<u64> {
        self.param(name).and_then(Value::as_u64)
    }

    /// Case-insensitive name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Default JOSE signing algorithm for a key shape
///
/// Used when neither the caller nor the key names an `alg`.
pub fn default_signing_algorithm(jwk: &Jwk) -> Option<&'static str> {
    match jwk.kty {
        KeyType::Ec => match jwk.crv.as_deref() {
            Some(crv) if curves::is_secp256k1(crv) => Some(names::ES256K),
            _ => None,
        },
        KeyType::Rsa => Some(names::RS256),
        KeyType::Okp => match jwk.crv.as_deref() {
            Some(curves::ED25519) => Some(names::EDDSA),
            _ => None,
        },
        KeyType::Oct => Some(names::HS256),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params() {
        let alg = Algorithm::new("RS256")
            .with_param(params::MODULUS_LENGTH, 4096)
            .with_param(params::HASH, names::SHA256);

        assert_eq!(alg.param_u64(params::MODULUS_LENGTH), Some(4096));
        assert_eq!(alg.param_str(params::HASH), Some("SHA-256"));
        assert!(alg.is("rs256"));
    }

    #[test]
    fn test_secp256k1_aliases() {
        assert!(curves::is_secp256k1("secp256k1"));
        assert!(curves::is_secp256k1("P-256K"));
        assert!(curves::is_secp256k1("K-256"));
        assert!(!curves::is_secp256k1("P-256"));
    }

    #[test]
    fn test_default_signing_algorithm() {
        let mut jwk = Jwk::new(KeyType::Ec);
        jwk.crv = Some("P-256K".into());
        assert_eq!(default_signing_algorithm(&jwk), Some("ES256K"));

        jwk.crv = Some("P-384".into());
        assert_eq!(default_signing_algorithm(&jwk), None);

        assert_eq!(default_signing_algorithm(&Jwk::new(KeyType::Oct)), Some("HS256"));
    }
}
