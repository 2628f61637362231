//! `CertificateWorkflow`: issue a root CA and a code-signing leaf, then
//! persist them as a password-protected container.

use std::path::Path;

use crate::domain::crypto::KeyAlgorithm;
use crate::domain::x509::DistinguishedName;
use crate::infra::config::SigningConfiguration;
use crate::infra::error::SigningResult;
use crate::services::cert_builder::{CertificateBuilder, Validity};
use crate::services::container::CertificateContainer;

/// What to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub root_subject: DistinguishedName,
    pub signer_subject: DistinguishedName,
    pub signer_serial: u64,
    pub validity_days: u32,
    pub key_algorithm: KeyAlgorithm,
}

impl CertificateRequest {
    /// Request described by `config`, with keys of `key_algorithm`.
    pub fn from_config(
        config: &SigningConfiguration,
        key_algorithm: KeyAlgorithm,
    ) -> SigningResult<Self> {
        Ok(Self {
            root_subject: config.certificates.root_subject.parse()?,
            signer_subject: config.certificates.signer_subject.parse()?,
            signer_serial: config.certificates.signer_serial,
            validity_days: config.certificates.validity_days,
            key_algorithm,
        })
    }
}

#[derive(Default)]
pub struct CertificateWorkflow {
    builder: CertificateBuilder,
}

impl CertificateWorkflow {
    #[must_use]
    pub fn new(builder: CertificateBuilder) -> Self {
        Self { builder }
    }

    /// Issue root and leaf. The container holds the leaf key and the root
    /// as its chain; the root key is discarded.
    pub fn issue(&self, request: &CertificateRequest) -> SigningResult<CertificateContainer> {
        log::info!(
            "Issuing {} certificates for \"{}\"",
            request.key_algorithm,
            request.signer_subject
        );
        let validity = Validity::days_around_now(request.validity_days)?;
        let (root, root_key) =
            self.builder
                .create_self_signed(&request.root_subject, validity, request.key_algorithm)?;
        let (leaf, leaf_key) = self.builder.create_signed(
            &request.signer_subject,
            &root,
            &root_key,
            request.signer_serial,
            validity,
            request.key_algorithm,
        )?;
        log::debug!("Leaf fingerprint {}", leaf.fingerprint());
        Ok(CertificateContainer::new(leaf, leaf_key)?.with_chain(vec![root]))
    }

    /// [`Self::issue`] and save the container to `output`.
    pub fn issue_to_file(
        &self,
        request: &CertificateRequest,
        output: &Path,
        password: &str,
    ) -> SigningResult<CertificateContainer> {
        let container = self.issue(request)?;
        container.save(output, password)?;
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn issue_from_default_config() {
        let request =
            CertificateRequest::from_config(&SigningConfiguration::default(), KeyAlgorithm::EcP256)
                .unwrap();
        assert_eq!(request.signer_subject.cn(), Some("my signer"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("code-signing.pfx");
        let issued = CertificateWorkflow::default()
            .issue_to_file(&request, &path, "our secret")
            .unwrap();

        let loaded = CertificateContainer::load(&path, "our secret").unwrap();
        assert_eq!(loaded.certificate, issued.certificate);
        assert_eq!(loaded.chain.len(), 1);
        assert!(loaded.chain[0].is_ca());
        assert_eq!(loaded.certificate.serial_number(), [1u8].as_slice());
    }
}
