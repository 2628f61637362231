//! `SignWorkflow` orchestrates the signing steps.
//!
//! Loads the signer's container, produces the SignedData and writes the
//! DER ContentInfo to disk.

use std::path::Path;

use crate::domain::pkcs7::SignedData;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::container::CertificateContainer;
use crate::services::signing::{CmsSigningService, SignOptions};

#[derive(Debug, Clone, Default)]
pub struct SignWorkflow {
    service: CmsSigningService,
}

impl SignWorkflow {
    #[must_use]
    pub fn new(options: SignOptions) -> Self {
        Self {
            service: CmsSigningService::new(options),
        }
    }

    #[must_use]
    pub fn options(&self) -> &SignOptions {
        self.service.options()
    }

    /// Sign `content` with the container's leaf and return the DER ContentInfo.
    pub fn sign(
        &self,
        content: &[u8],
        container: &CertificateContainer,
    ) -> SigningResult<(SignedData, Vec<u8>)> {
        let signed = self
            .service
            .sign(content, &container.cert_chain(), &container.key)?;
        let der = signed.to_content_info_der();
        log::debug!("SignedData encoded to {} bytes", der.len());
        Ok((signed, der))
    }

    /// Load the container at `container_path`, sign `content` and write the
    /// signature to `output`.
    pub fn sign_to_file(
        &self,
        content: &[u8],
        container_path: &Path,
        password: &str,
        output: &Path,
    ) -> SigningResult<SignedData> {
        let container = CertificateContainer::load(container_path, password)?;
        let (signed, der) = self.sign(content, &container)?;
        std::fs::write(output, der).map_err(|e| {
            SigningError::IoError(format!("Failed to write {}: {e}", output.display()))
        })?;
        log::info!("Wrote signature {}", output.display());
        Ok(signed)
    }
}
