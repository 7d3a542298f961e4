//! # Master Seed
//!
//! The root secret every pairwise key is derived from, plus its BIP39
//! backup phrase.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SEED LIFECYCLE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  generate_with_phrase(passphrase)                                      │
//! │     │                                                                   │
//! │     ├── 256 bits OS entropy ──► 24-word RecoveryPhrase (shown once)    │
//! │     │                                                                   │
//! │     └── PBKDF2-HMAC-SHA512(phrase, "mnemonic" ‖ passphrase, 2048)      │
//! │              │                                                          │
//! │              ▼                                                          │
//! │         first 32 bytes ──► MasterSeed                                  │
//! │                                                                         │
//! │  from_recovery_phrase(phrase, passphrase) repeats the last two steps.  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The BIP39 seed function is one-way: a seed created with
//! [`MasterSeed::generate`] has no phrase. Use
//! [`MasterSeed::generate_with_phrase`] when a backup is needed.

use bip39::Mnemonic;
use rand::RngCore;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Number of words in a recovery phrase
pub const WORD_COUNT: usize = 24;

/// Master seed size in bytes (256 bits)
pub const SEED_SIZE: usize = 32;

/// Root secret for pairwise key derivation
///
/// Any non-empty byte string is accepted as an HMAC key; generated seeds
/// are [`SEED_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSeed {
    bytes: Zeroizing<Vec<u8>>,
}

impl MasterSeed {
    /// Fresh seed from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; SEED_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap existing seed bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(Error::InvalidKey("Master seed is empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Fresh seed together with the phrase that recreates it
    pub fn generate_with_phrase(passphrase: &str) -> Result<(Self, RecoveryPhrase)> {
        let phrase = RecoveryPhrase::generate()?;
        let seed = Self::from_recovery_phrase(&phrase, passphrase);
        Ok((seed, phrase))
    }

    /// Recreate the seed from its backup phrase
    pub fn from_recovery_phrase(phrase: &RecoveryPhrase, passphrase: &str) -> Self {
        let full = Zeroizing::new(phrase.mnemonic.to_seed(passphrase));
        Self {
            bytes: Zeroizing::new(full[..SEED_SIZE].to_vec()),
        }
    }

    /// Raw seed bytes
    ///
    /// ## Security Warning
    ///
    /// Never log or transmit these bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterSeed([REDACTED; {}])", self.bytes.len())
    }
}

/// 24-word BIP39 backup of a master seed
#[derive(ZeroizeOnDrop)]
pub struct RecoveryPhrase {
    #[zeroize(skip)]
    mnemonic: Mnemonic,
}

impl RecoveryPhrase {
    /// New phrase from 256 bits of OS entropy
    pub fn generate() -> Result<Self> {
        let mut entropy = Zeroizing::new([0u8; SEED_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut entropy[..]);

        let mnemonic = Mnemonic::from_entropy(&entropy[..])
            .map_err(|e| Error::KeyDerivationFailed(format!("Mnemonic generation: {}", e)))?;
        Ok(Self { mnemonic })
    }

    /// Parse and checksum a phrase; exactly 24 English words
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| Error::InvalidRecoveryPhrase(e.to_string()))?;
        if mnemonic.word_count() != WORD_COUNT {
            return Err(Error::InvalidRecoveryPhrase(format!(
                "Expected {} words, got {}",
                WORD_COUNT,
                mnemonic.word_count()
            )));
        }
        Ok(Self { mnemonic })
    }

    /// The words in order
    pub fn words(&self) -> Vec<&'static str> {
        self.mnemonic.words().collect()
    }

    /// Words joined by single spaces. Display only.
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }
}

impl std::fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoveryPhrase([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ART: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

    #[test]
    fn test_generated_seed_size() {
        let seed = MasterSeed::generate();
        assert_eq!(seed.as_bytes().len(), SEED_SIZE);
        assert_ne!(seed, MasterSeed::generate());
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert!(MasterSeed::from_bytes(Vec::new()).is_err());
        assert!(MasterSeed::from_bytes(b"abcdefg".to_vec()).is_ok());
    }

    #[test]
    fn test_phrase_recreates_seed() {
        let (seed, phrase) = MasterSeed::generate_with_phrase("").unwrap();
        assert_eq!(phrase.words().len(), WORD_COUNT);

        let parsed = RecoveryPhrase::from_phrase(&phrase.phrase()).unwrap();
        assert_eq!(MasterSeed::from_recovery_phrase(&parsed, ""), seed);
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let phrase = RecoveryPhrase::from_phrase(ART).unwrap();
        let plain = MasterSeed::from_recovery_phrase(&phrase, "");
        let salted = MasterSeed::from_recovery_phrase(&phrase, "TREZOR");
        assert_ne!(plain, salted);
    }

    #[test]
    fn test_bip39_vector() {
        // BIP39 test vector: all-zero entropy, passphrase "TREZOR"
        let phrase = RecoveryPhrase::from_phrase(ART).unwrap();
        let seed = MasterSeed::from_recovery_phrase(&phrase, "TREZOR");
        assert_eq!(&seed.as_bytes()[..4], &[0xbdu8, 0xa8, 0x54, 0x46]);
    }

    #[test]
    fn test_bad_phrases_rejected() {
        assert!(RecoveryPhrase::from_phrase("abandon abandon abandon").is_err());
        let bad_checksum = ART.replace(" art", " abandon");
        assert!(matches!(
            RecoveryPhrase::from_phrase(&bad_checksum),
            Err(Error::InvalidRecoveryPhrase(_))
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let (seed, phrase) = MasterSeed::generate_with_phrase("").unwrap();
        assert!(format!("{:?}", seed).contains("REDACTED"));
        assert_eq!(format!("{:?}", phrase), "RecoveryPhrase([REDACTED])");
    }
}
