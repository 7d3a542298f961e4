//! SHA-2 digests.

use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::crypto::algorithm::{names, Algorithm};
use crate::crypto::provider::Provider;
use crate::error::{Error, Result};

/// SHA-256 / SHA-384 / SHA-512
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestProvider;

impl Provider for DigestProvider {
    fn name(&self) -> &str {
        "software-digest"
    }

    fn digest(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>> {
        match algorithm.name.to_ascii_uppercase().as_str() {
            names::SHA256 => Ok(Sha256::digest(data).to_vec()),
            names::SHA384 => Ok(Sha384::digest(data).to_vec()),
            names::SHA512 => Ok(Sha512::digest(data).to_vec()),
            _ => Err(Error::UnsupportedOperation(format!(
                "Digest algorithm {}",
                algorithm.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_abc() {
        let digest = DigestProvider.digest(&Algorithm::new("SHA-256"), b"abc").unwrap();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_lengths() {
        for (name, len) in [("SHA-256", 32), ("SHA-384", 48), ("sha-512", 64)] {
            assert_eq!(DigestProvider.digest(&Algorithm::new(name), b"").unwrap().len(), len);
        }
        assert!(DigestProvider.digest(&Algorithm::new("MD5"), b"").is_err());
    }
}
