//! `VerifyWorkflow`: high-level facade for verifying `.p7s` signatures.
//!
//! Delegates to `VerificationService`; keeps symmetry with the sign workflow.

use std::path::Path;

use crate::domain::asn1::DecodeMode;
use crate::domain::pkcs7::SignedData;
use crate::domain::verification::VerificationReport;
use crate::domain::x509::Certificate;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::verification::{SignerInspection, VerificationService, VerifierPolicy};

/// Orchestrates verification steps for a detached signature.
#[derive(Debug, Clone, Default)]
pub struct VerifyWorkflow {
    svc: VerificationService,
    trusted: Vec<Certificate>,
}

impl VerifyWorkflow {
    #[must_use]
    pub fn new(policy: VerifierPolicy, decode_mode: DecodeMode) -> Self {
        Self {
            svc: VerificationService::new(policy).with_decode_mode(decode_mode),
            trusted: Vec::new(),
        }
    }

    /// Certificates searched before those embedded in the signature.
    #[must_use]
    pub fn with_trusted(mut self, trusted: Vec<Certificate>) -> Self {
        self.trusted = trusted;
        self
    }

    /// Run verification over DER ContentInfo bytes.
    pub fn run(&self, signature: &[u8], content: Option<&[u8]>) -> SigningResult<VerificationReport> {
        self.svc.verify_der(signature, content, &self.trusted)
    }

    /// Read `signature_path` and verify it against `content`.
    pub fn run_file(
        &self,
        signature_path: &Path,
        content: Option<&[u8]>,
    ) -> SigningResult<VerificationReport> {
        let der = read_signature(signature_path)?;
        self.run(&der, content)
    }

    /// Describe the signers in `signature_path`.
    pub fn inspect_file(&self, signature_path: &Path) -> SigningResult<Vec<SignerInspection>> {
        let der = read_signature(signature_path)?;
        let signed = SignedData::from_content_info_der(&der, self.decode_mode())?;
        Ok(self.svc.inspect(&signed))
    }

    fn decode_mode(&self) -> DecodeMode {
        self.svc.decode_mode()
    }
}

fn read_signature(path: &Path) -> SigningResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| SigningError::IoError(format!("Failed to read {}: {e}", path.display())))
}
