use std::fmt;

use super::SignatureAlgorithm;

/// Wrapper over a CMS/PKCS#7 signature value.
/// For ECDSA the bytes are the ASN.1 DER encoded Ecdsa-Sig-Value; for RSA the
/// PKCS#1 v1.5 signature block.
#[derive(Clone, Eq, PartialEq)]
pub struct CmsSignature {
    algo: SignatureAlgorithm,
    bytes: Box<[u8]>,
}

impl CmsSignature {
    #[must_use]
    pub fn new(algo: SignatureAlgorithm, bytes: Vec<u8>) -> Self {
        Self {
            algo,
            bytes: bytes.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
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
}

impl fmt::Debug for CmsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CmsSignature(algo={:?}, len={})",
            self.algo,
            self.bytes.len()
        )
    }
}
