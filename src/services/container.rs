//! Password-protected certificate container (PFX equivalent).
//!
//! ```text
//! CertificateContainer ::= SEQUENCE {
//!     version     INTEGER (1),
//!     certificate Certificate,
//!     chain       SEQUENCE OF Certificate,
//!     key         EncryptedPrivateKeyInfo }
//! ```
//!
//! The key is PKCS#8 encrypted with PBES2 (PBKDF2-SHA256, AES-256-CBC).

use std::fmt;
use std::path::Path;

use crate::adapters::{PrivateKey, DEFAULT_KDF_ITERATIONS};
use crate::domain::asn1::{DerDecode, Decoder, Encoder};
use crate::domain::constants::CONTAINER_VERSION;
use crate::domain::x509::{CertChain, Certificate};
use crate::infra::error::{SigningError, SigningResult};

/// A signing certificate, its issuers and its private key.
pub struct CertificateContainer {
    pub certificate: Certificate,
    pub chain: Vec<Certificate>,
    pub key: PrivateKey,
}

impl CertificateContainer {
    /// # Errors
    ///
    /// `CertificateError` when `key` does not belong to `certificate`.
    pub fn new(certificate: Certificate, key: PrivateKey) -> SigningResult<Self> {
        if key.public_key().to_spki() != *certificate.public_key_info() {
            return Err(SigningError::CertificateError(format!(
                "private key does not match certificate \"{}\"",
                certificate.subject()
            )));
        }
        Ok(Self {
            certificate,
            chain: Vec::new(),
            key,
        })
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Vec<Certificate>) -> Self {
        self.chain = chain;
        self
    }

    pub fn cert_chain(&self) -> CertChain {
        CertChain::new(self.certificate.clone()).with_issuers(self.chain.clone())
    }

    pub fn export(&self, password: &str) -> SigningResult<Vec<u8>> {
        self.export_with_iterations(password, DEFAULT_KDF_ITERATIONS)
    }

    pub fn export_with_iterations(&self, password: &str, iterations: u32) -> SigningResult<Vec<u8>> {
        let encrypted_key = self
            .key
            .to_encrypted_pkcs8_der(password.as_bytes(), iterations)?;
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            seq.write_u64(CONTAINER_VERSION);
            seq.write(&self.certificate);
            seq.write_sequence(|chain| {
                for cert in &self.chain {
                    chain.write(cert);
                }
            });
            seq.write_raw(&encrypted_key);
        });
        Ok(enc.finish())
    }

    /// Decode and decrypt a container.
    ///
    /// # Errors
    ///
    /// `CertificateError` for a wrong password or a key that does not match
    /// the certificate; `MalformedEncoding` for undecodable bytes.
    pub fn import(der: &[u8], password: &str) -> SigningResult<Self> {
        let mut dec = Decoder::new(der);
        let mut seq = dec.read_sequence()?;
        let version = seq.read_u64()?;
        if version != CONTAINER_VERSION {
            return Err(SigningError::CertificateError(format!(
                "unsupported container version {version}"
            )));
        }
        let certificate = Certificate::decode(&mut seq)?;
        let mut chain_seq = seq.read_sequence()?;
        let mut chain = Vec::new();
        while !chain_seq.is_empty() {
            chain.push(Certificate::decode(&mut chain_seq)?);
        }
        let encrypted_key = seq.read_raw_element()?;
        seq.expect_end("CertificateContainer")?;
        dec.expect_end("container")?;

        let key = PrivateKey::from_encrypted_pkcs8_der(encrypted_key, password.as_bytes())
            .map_err(|e| {
                log::debug!("Key decryption failed: {e}");
                SigningError::CertificateError(
                    "cannot decrypt private key: wrong password or corrupted container".into(),
                )
            })?;
        Ok(Self::new(certificate, key)?.with_chain(chain))
    }

    pub fn save(&self, path: &Path, password: &str) -> SigningResult<()> {
        let der = self.export(password)?;
        std::fs::write(path, der).map_err(|e| {
            SigningError::IoError(format!("Failed to write {}: {e}", path.display()))
        })?;
        log::info!("Wrote certificate container {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path, password: &str) -> SigningResult<Self> {
        let der = std::fs::read(path).map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let container = Self::import(&der, password)?;
        log::debug!("Loaded {container:?} from {}", path.display());
        Ok(container)
    }
}

impl fmt::Debug for CertificateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateContainer")
            .field("subject", &self.certificate.subject().to_string())
            .field("chain", &self.chain.len())
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::KeyAlgorithm;
    use crate::domain::x509::DistinguishedName;
    use crate::services::cert_builder::{CertificateBuilder, Validity};

    fn container() -> CertificateContainer {
        let builder = CertificateBuilder::default();
        let validity = Validity::days_around_now(1).unwrap();
        let (root, root_key) = builder
            .create_self_signed(
                &DistinguishedName::common_name("my root"),
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        let (leaf, key) = builder
            .create_signed(
                &DistinguishedName::common_name("my signer"),
                &root,
                &root_key,
                1,
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        CertificateContainer::new(leaf, key)
            .unwrap()
            .with_chain(vec![root])
    }

    #[test]
    fn test_export_import_roundtrip() {
        let original = container();
        let der = original.export_with_iterations("our secret", 1_000).unwrap();
        let restored = CertificateContainer::import(&der, "our secret").unwrap();
        assert_eq!(restored.certificate, original.certificate);
        assert_eq!(restored.chain, original.chain);
        assert_eq!(restored.key.public_key(), original.key.public_key());
    }

    #[test]
    fn test_wrong_password_is_certificate_error() {
        let der = container()
            .export_with_iterations("our secret", 1_000)
            .unwrap();
        let err = CertificateContainer::import(&der, "their secret").unwrap_err();
        assert!(matches!(err, SigningError::CertificateError(_)));
    }

    #[test]
    fn test_truncated_container_is_malformed() {
        let der = container()
            .export_with_iterations("our secret", 1_000)
            .unwrap();
        let err = CertificateContainer::import(&der[..der.len() - 4], "our secret").unwrap_err();
        assert!(matches!(err, SigningError::MalformedEncoding(_)));
    }

    #[test]
    fn test_mismatched_key_is_refused() {
        let first = container();
        let second = container();
        let err = CertificateContainer::new(first.certificate, second.key).unwrap_err();
        assert!(matches!(err, SigningError::CertificateError(_)));
    }
}
