//! Hash algorithm domain type.
//!
//! Provides the core `HashAlgorithm` enumeration supporting SHA-256, SHA-384,
//! and SHA-512 for CMS digests, with OID mapping and digest computation
//! through the `sha2` crate.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha384, Sha512};

use super::{AlgorithmIdentifier, DigestBytes};
use crate::domain::asn1::ObjectIdentifier;
use crate::domain::constants::{OID_SHA256, OID_SHA384, OID_SHA512};
use crate::infra::error::SigningError;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha256, Self::Sha384, Self::Sha512];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// NIST digest algorithm OID.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha256 => OID_SHA256,
            HashAlgorithm::Sha384 => OID_SHA384,
            HashAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// Look up a digest algorithm by OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.oid() == *oid)
    }

    /// Resolve a digestAlgorithm identifier. Parameters must be absent or NULL.
    pub fn from_identifier(identifier: &AlgorithmIdentifier) -> Option<Self> {
        if identifier.parameters.is_other() {
            return None;
        }
        Self::from_oid(&identifier.oid)
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> DigestBytes {
        let bytes = match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        };
        DigestBytes::from_computed(*self, bytes)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

impl FromStr for HashAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(SigningError::UnsupportedAlgorithm(format!(
                "unknown digest algorithm '{s}' (expected sha256, sha384 or sha512)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm() {
        assert_eq!(HashAlgorithm::Sha256.as_str(), "sha256");
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);

        assert_eq!(HashAlgorithm::Sha384.as_str(), "sha384");
        assert_eq!(HashAlgorithm::Sha384.digest_size(), 48);

        assert_eq!(HashAlgorithm::Sha512.as_str(), "sha512");
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("SHA-384".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha384);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_oid_lookup() {
        for algo in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_oid(&algo.oid()), Some(algo));
        }
        assert_eq!(
            HashAlgorithm::from_oid(&crate::domain::constants::OID_DATA),
            None
        );
    }

    #[test]
    fn test_digest_known_answer() {
        let digest = HashAlgorithm::Sha256.digest(b"abc");
        assert_eq!(
            hex::encode(digest.as_slice()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
