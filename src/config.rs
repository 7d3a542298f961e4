//! # Engine Configuration
//!
//! Tunables for key generation, pairwise derivation and JWE defaults.
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```json
//! { "pairwise": { "rsa_modulus_bits": 1024 }, "pbes2": { "iterations": 100000 } }
//! ```
//!
//! | Setting | Default | Used by |
//! |---------|---------|---------|
//! | `rsa_modulus_bits` | 4096 | `CryptoEngine::generate_key_pair(Rsa)` |
//! | `ec_curve` | secp256k1 | `CryptoEngine::generate_key_pair(Ec)` |
//! | `pairwise.rsa_modulus_bits` | 2048 | pairwise RSA keys (set 4096 for long-lived keys) |
//! | `pairwise.miller_rabin_rounds` | 20 | pairwise prime search |
//! | `pairwise.max_prime_candidates` | 100 000 | pairwise prime search bound |
//! | `pbes2.salt_len` | 16 | password-based JWE |
//! | `pbes2.iterations` | 8192 | password-based JWE |
//! | `pbes2.max_iterations` | 1 000 000 | highest `p2c` accepted when decrypting |
//! | `jwe.content_encryption` | A256GCM | every JWE |
//!
//! Pairwise RSA keys are rederived on every lookup miss, and each prime is
//! found by a sequential Miller-Rabin search over a deterministic candidate
//! stream. A 4096-bit key costs several times a 2048-bit one, so the default
//! stays at 2048 and callers opt in to 4096.

use serde::{Deserialize, Serialize};

use crate::crypto::algorithm::{curves, names};
use crate::error::{Error, Result};

/// Bits of HMAC-SHA512 output per chain round
const HMAC_SHA512_BITS: usize = 512;

/// Top-level engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Modulus size of generated (non-pairwise) RSA keys
    pub rsa_modulus_bits: usize,
    /// Curve of generated EC keys
    pub ec_curve: String,
    /// Pairwise derivation
    pub pairwise: PairwiseConfig,
    /// Password-based key wrap
    pub pbes2: Pbes2Config,
    /// JWE defaults
    pub jwe: JweConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: 4096,
            ec_curve: curves::SECP256K1.to_string(),
            pairwise: PairwiseConfig::default(),
            pbes2: Pbes2Config::default(),
            jwe: JweConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting is usable
    pub fn validate(&self) -> Result<()> {
        if self.rsa_modulus_bits < 2048 || self.rsa_modulus_bits % 8 != 0 {
            return Err(Error::InvalidConfig(format!(
                "rsa_modulus_bits must be a multiple of 8 and at least 2048, got {}",
                self.rsa_modulus_bits
            )));
        }
        if !curves::is_secp256k1(&self.ec_curve) {
            return Err(Error::InvalidConfig(format!(
                "ec_curve must be secp256k1, got {}",
                self.ec_curve
            )));
        }
        self.pairwise.validate()?;
        self.pbes2.validate()?;
        self.jwe.validate()
    }
}

/// Pairwise key derivation settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseConfig {
    /// Modulus size of pairwise RSA keys
    pub rsa_modulus_bits: usize,
    /// Miller-Rabin rounds per prime candidate
    pub miller_rabin_rounds: usize,
    /// Candidates tested per prime before giving up
    pub max_prime_candidates: usize,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: 2048,
            miller_rabin_rounds: 20,
            max_prime_candidates: 100_000,
        }
    }
}

impl PairwiseConfig {
    /// Bits in each prime
    pub fn prime_bits(&self) -> usize {
        self.rsa_modulus_bits / 2
    }

    /// HMAC-SHA512 chain rounds needed to cover one prime
    pub fn hmac_rounds(&self) -> usize {
        (self.prime_bits() + HMAC_SHA512_BITS - 1) / HMAC_SHA512_BITS
    }

    /// Check the settings
    pub fn validate(&self) -> Result<()> {
        if self.rsa_modulus_bits < 256 || self.rsa_modulus_bits % 16 != 0 {
            return Err(Error::InvalidConfig(format!(
                "pairwise.rsa_modulus_bits must be a multiple of 16 and at least 256, got {}",
                self.rsa_modulus_bits
            )));
        }
        if self.miller_rabin_rounds == 0 {
            return Err(Error::InvalidConfig(
                "pairwise.miller_rabin_rounds must be positive".into(),
            ));
        }
        if self.max_prime_candidates == 0 {
            return Err(Error::InvalidConfig(
                "pairwise.max_prime_candidates must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// PBES2 settings for password-based JWE
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pbes2Config {
    /// Random salt input (`p2s`) length in bytes
    pub salt_len: usize,
    /// PBKDF2 iteration count (`p2c`) used when encrypting
    pub iterations: u32,
    /// Largest `p2c` a token may demand when decrypting
    pub max_iterations: u32,
}

impl Default for Pbes2Config {
    fn default() -> Self {
        Self {
            salt_len: 16,
            iterations: 8192,
            max_iterations: 1_000_000,
        }
    }
}

impl Pbes2Config {
    /// Check the settings
    pub fn validate(&self) -> Result<()> {
        if self.salt_len < 8 {
            return Err(Error::InvalidConfig(format!(
                "pbes2.salt_len must be at least 8, got {}",
                self.salt_len
            )));
        }
        if self.iterations < crate::crypto::software::Pbes2Provider::MIN_ITERATIONS {
            return Err(Error::InvalidConfig(format!(
                "pbes2.iterations must be at least {}, got {}",
                crate::crypto::software::Pbes2Provider::MIN_ITERATIONS,
                self.iterations
            )));
        }
        if self.max_iterations < self.iterations {
            return Err(Error::InvalidConfig(format!(
                "pbes2.max_iterations ({}) is below pbes2.iterations ({})",
                self.max_iterations, self.iterations
            )));
        }
        Ok(())
    }
}

/// JWE defaults
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JweConfig {
    /// Content encryption algorithm (`enc`)
    pub content_encryption: String,
}

impl Default for JweConfig {
    fn default() -> Self {
        Self {
            content_encryption: names::A256GCM.to_string(),
        }
    }
}

impl JweConfig {
    /// Check the settings
    pub fn validate(&self) -> Result<()> {
        match self.content_encryption.as_str() {
            names::A128GCM | names::A256GCM => Ok(()),
            other => Err(Error::InvalidConfig(format!(
                "jwe.content_encryption must be A128GCM or A256GCM, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rsa_modulus_bits, 4096);
        assert_eq!(config.pairwise.rsa_modulus_bits, 2048);
        assert_eq!(config.pairwise.miller_rabin_rounds, 20);
        assert_eq!(config.pbes2.salt_len, 16);
        assert_eq!(config.pbes2.iterations, 8192);
        assert_eq!(config.pbes2.max_iterations, 1_000_000);
        assert_eq!(config.jwe.content_encryption, "A256GCM");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json(r#"{"pairwise":{"rsa_modulus_bits":1024}}"#).unwrap();
        assert_eq!(config.pairwise.rsa_modulus_bits, 1024);
        assert_eq!(config.pairwise.max_prime_candidates, 100_000);
        assert_eq!(config.rsa_modulus_bits, 4096);
    }

    #[test]
    fn test_hmac_rounds() {
        let mut pairwise = PairwiseConfig::default();
        assert_eq!(pairwise.hmac_rounds(), 2);
        pairwise.rsa_modulus_bits = 512;
        assert_eq!(pairwise.hmac_rounds(), 1);
        pairwise.rsa_modulus_bits = 4096;
        assert_eq!(pairwise.hmac_rounds(), 4);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(EngineConfig::from_json(r#"{"rsa_modulus_bits":1000}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"ec_curve":"P-256"}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"pbes2":{"iterations":10}}"#).is_err());
        assert!(
            EngineConfig::from_json(r#"{"pbes2":{"iterations":20000,"max_iterations":10000}}"#)
                .is_err()
        );
        assert!(EngineConfig::from_json(r#"{"jwe":{"content_encryption":"A128CBC-HS256"}}"#).is_err());
    }
}
