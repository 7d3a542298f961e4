//! # Error Handling
//!
//! This module provides the error types for Persona Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Store Errors                                                  │
//! │  │   ├── KeyNotFound           - Unknown key reference or kid          │
//! │  │   └── InvalidKey            - JWK inconsistent with its kty         │
//! │  │                                                                      │
//! │  ├── Provider Errors                                                   │
//! │  │   ├── NoProviderForAlgorithm - Nothing registered for alg + scope   │
//! │  │   ├── UnsupportedOperation  - Provider lacks the primitive          │
//! │  │   └── KeyNotExtractable     - Export of a sealed key                │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── NoAlgorithmSpecified  - Neither caller nor key names an alg   │
//! │  │   ├── CannotGenerateSymmetricKey                                    │
//! │  │   ├── SignatureInvalid      - Expected outcome, recoverable         │
//! │  │   ├── EncryptionFailed / DecryptionFailed                           │
//! │  │   └── UnsupportedKeyForEncryption                                   │
//! │  │                                                                      │
//! │  ├── Derivation Errors                                                 │
//! │  │   ├── UnsupportedCurve      - Pairwise EC only on secp256k1         │
//! │  │   ├── PrimeSearchExhausted  - Bounded RSA prime search gave up      │
//! │  │   ├── KeyDerivationFailed                                           │
//! │  │   └── InvalidRecoveryPhrase                                         │
//! │  │                                                                      │
//! │  ├── Token Errors                                                      │
//! │  │   └── MalformedToken        - Unparsable / ambiguous JOSE shape     │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Internal / SerializationError                                 │
//! │      └── InvalidConfig         - Engine settings out of range          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//!
//! Nothing in this crate retries. `SignatureInvalid` and `DecryptionFailed`
//! are ordinary outcomes of checking someone else's token and report
//! `is_recoverable() == true`; everything else is a programming or
//! configuration error that should stop the caller.

use thiserror::Error;

/// Result type alias for Persona Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Persona Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Store Errors (100-199)
    // ========================================================================

    /// No key stored under this reference or kid
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Invalid key format, length or JWK field combination
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Provider Errors (200-299)
    // ========================================================================

    /// No provider registered for the algorithm at the requested scope
    #[error("No provider registered for algorithm '{algorithm}' ({scope})")]
    NoProviderForAlgorithm {
        /// Normalized algorithm name
        algorithm: String,
        /// Requested scope
        scope: String,
    },

    /// The provider does not implement this primitive
    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    /// The key was imported or generated as non-extractable
    #[error("Key is not extractable")]
    KeyNotExtractable,

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Neither the caller nor the key specified an algorithm
    #[error("No algorithm specified and the key carries no 'alg'")]
    NoAlgorithmSpecified,

    /// Key pair generation was requested for a symmetric key type
    #[error("Cannot generate a key pair for a symmetric key type")]
    CannotGenerateSymmetricKey,

    /// Signature did not verify
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The recipient key has no supported key management algorithm
    #[error("Unsupported key for encryption: {0}")]
    UnsupportedKeyForEncryption(String),

    /// Signing failed inside a provider
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // ========================================================================
    // Derivation Errors (400-499)
    // ========================================================================

    /// Pairwise EC derivation only supports secp256k1
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// The bounded prime search did not find a prime
    #[error("Prime search exhausted after {candidates} candidates ({bits} bits)")]
    PrimeSearchExhausted {
        /// Candidates tested before giving up
        candidates: usize,
        /// Requested prime size
        bits: usize,
    },

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    /// Invalid recovery phrase
    #[error("Invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    // ========================================================================
    // Token Errors (500-599)
    // ========================================================================

    /// Unparsable or ambiguous JWS / JWE
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Engine configuration out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Key store
    /// - 200-299: Providers
    /// - 300-399: Crypto
    /// - 400-499: Derivation
    /// - 500-599: Tokens
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Key store (100-199)
            Error::KeyNotFound(_) => 100,
            Error::InvalidKey(_) => 101,

            // Providers (200-299)
            Error::NoProviderForAlgorithm { .. } => 200,
            Error::UnsupportedOperation(_) => 201,
            Error::KeyNotExtractable => 202,

            // Crypto (300-399)
            Error::NoAlgorithmSpecified => 300,
            Error::CannotGenerateSymmetricKey => 301,
            Error::SignatureInvalid => 302,
            Error::EncryptionFailed(_) => 303,
            Error::DecryptionFailed(_) => 304,
            Error::UnsupportedKeyForEncryption(_) => 305,
            Error::SigningFailed(_) => 306,

            // Derivation (400-499)
            Error::UnsupportedCurve(_) => 400,
            Error::PrimeSearchExhausted { .. } => 401,
            Error::KeyDerivationFailed(_) => 402,
            Error::InvalidRecoveryPhrase(_) => 403,

            // Tokens (500-599)
            Error::MalformedToken(_) => 500,

            // Internal (900-999)
            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
            Error::InvalidConfig(_) => 902,
        }
    }

    /// Check if this error is an expected outcome rather than a fault
    ///
    /// A token signed or encrypted by someone else failing to check out is
    /// normal; callers branch on it instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SignatureInvalid | Error::DecryptionFailed(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::MalformedToken(format!("Invalid base64url: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::KeyNotFound("k".into()).code(), 100);
        assert_eq!(
            Error::NoProviderForAlgorithm {
                algorithm: "es256k".into(),
                scope: "public".into()
            }
            .code(),
            200
        );
        assert_eq!(Error::SignatureInvalid.code(), 302);
        assert_eq!(Error::UnsupportedCurve("P-384".into()).code(), 400);
        assert_eq!(Error::MalformedToken("x".into()).code(), 500);
        assert_eq!(Error::Internal("test".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::SignatureInvalid.is_recoverable());
        assert!(Error::DecryptionFailed("tag".into()).is_recoverable());
        assert!(!Error::KeyNotFound("k".into()).is_recoverable());
        assert!(!Error::PrimeSearchExhausted { candidates: 1, bits: 8 }.is_recoverable());
    }

    #[test]
    fn test_base64_conversion() {
        use base64::Engine;
        let err: Error = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode("***")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), 500);
    }
}
