use std::fmt;

use super::HashAlgorithm;

/// Strongly typed digest bytes paired with the algorithm that produced them.
///
/// Invariant: `bytes.len() == algo.digest_size()`.
#[derive(Clone, Eq, PartialEq)]
pub struct DigestBytes {
    algo: HashAlgorithm,
    bytes: Box<[u8]>,
}

impl DigestBytes {
    pub fn new(algo: HashAlgorithm, bytes: Vec<u8>) -> Result<Self, DigestBytesError> {
        if bytes.len() != algo.digest_size() {
            return Err(DigestBytesError::LengthMismatch {
                expected: algo.digest_size(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            algo,
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Output of `HashAlgorithm::digest`, whose length is correct by construction.
    pub(crate) fn from_computed(algo: HashAlgorithm, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), algo.digest_size());
        Self {
            algo,
            bytes: bytes.into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algo
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into()
    }

    /// True when `other` carries exactly these digest bytes.
    #[must_use]
    pub fn matches(&self, other: &[u8]) -> bool {
        self.bytes.as_ref() == other
    }
}

impl fmt::Debug for DigestBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DigestBytes(algo={:?}, len={})",
            self.algo,
            self.bytes.len()
        )
    }
}

impl fmt::Display for DigestBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo.as_str(), hex::encode(&self.bytes))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestBytesError {
    #[error("digest length mismatch (expected {expected}, actual {actual})")]
    LengthMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_checked() {
        assert!(DigestBytes::new(HashAlgorithm::Sha256, vec![0u8; 32]).is_ok());
        assert_eq!(
            DigestBytes::new(HashAlgorithm::Sha384, vec![0u8; 32]).unwrap_err(),
            DigestBytesError::LengthMismatch {
                expected: 48,
                actual: 32
            }
        );
    }

    #[test]
    fn test_matches() {
        let digest = HashAlgorithm::Sha256.digest(&[1, 2, 3]);
        let copy = digest.as_slice().to_vec();
        assert!(digest.matches(&copy));
        assert!(!digest.matches(&copy[1..]));
    }
}
