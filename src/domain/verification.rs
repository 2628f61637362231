//! Verification domain types for CMS SignedData.
//!
//! Every SignerInfo walks the same stage machine:
//! `Decoded -> DigestChecked -> AlgorithmResolved -> SignatureChecked`.
//! The first failing stage decides the rejection reason. Rejections are
//! ordinary values ([`VerificationError`]), distinct from codec or I/O
//! failures reported through `SigningError`.

use std::fmt;

use crate::domain::asn1::ObjectIdentifier;
use crate::domain::crypto::SignatureAlgorithm;

/// Stage reached by a signer before it verified or was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VerificationStage {
    /// Structure decoded and signer certificate resolved.
    Decoded,
    /// Content digest compared with the messageDigest attribute.
    DigestChecked,
    /// signatureAlgorithm canonicalized against digestAlgorithm and key.
    AlgorithmResolved,
    /// Signature bytes verified with the signer's public key.
    SignatureChecked,
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerificationStage::Decoded => "Decoded",
            VerificationStage::DigestChecked => "DigestChecked",
            VerificationStage::AlgorithmResolved => "AlgorithmResolved",
            VerificationStage::SignatureChecked => "SignatureChecked",
        })
    }
}

/// Why a signer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    DigestMismatch,
    SignatureInvalid,
    UnresolvedCertificate,
    UnsupportedAlgorithm,
}

impl RejectionReason {
    /// The stage whose check produces this reason.
    pub fn stage(&self) -> VerificationStage {
        match self {
            RejectionReason::UnresolvedCertificate => VerificationStage::Decoded,
            RejectionReason::DigestMismatch => VerificationStage::DigestChecked,
            RejectionReason::UnsupportedAlgorithm => VerificationStage::AlgorithmResolved,
            RejectionReason::SignatureInvalid => VerificationStage::SignatureChecked,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectionReason::DigestMismatch => "DigestMismatch",
            RejectionReason::SignatureInvalid => "SignatureInvalid",
            RejectionReason::UnresolvedCertificate => "UnresolvedCertificate",
            RejectionReason::UnsupportedAlgorithm => "UnsupportedAlgorithm",
        })
    }
}

/// A rejected signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("signer #{signer_index} rejected at stage {stage}: {reason} ({detail})")]
#[diagnostic(code(cms_signer::verification_rejected))]
pub struct VerificationError {
    pub signer_index: usize,
    pub stage: VerificationStage,
    pub reason: RejectionReason,
    pub detail: String,
}

impl VerificationError {
    pub fn new(signer_index: usize, reason: RejectionReason, detail: impl Into<String>) -> Self {
        Self {
            signer_index,
            stage: reason.stage(),
            reason,
            detail: detail.into(),
        }
    }

    /// Rejection recorded at an explicit stage rather than the reason's usual one.
    pub fn at(
        signer_index: usize,
        stage: VerificationStage,
        reason: RejectionReason,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            signer_index,
            stage,
            reason,
            detail: detail.into(),
        }
    }
}

/// Outcome for one SignerInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerReport {
    pub signer_index: usize,
    /// signatureAlgorithm OID exactly as found on the wire.
    pub signature_algorithm_oid: ObjectIdentifier,
    /// digestAlgorithm OID exactly as found on the wire.
    pub digest_algorithm_oid: ObjectIdentifier,
    /// Canonical scheme, once resolved.
    pub canonical_algorithm: Option<SignatureAlgorithm>,
    /// Subject of the resolved signer certificate.
    pub signer_subject: Option<String>,
    /// Last stage passed.
    pub stage_reached: Option<VerificationStage>,
    pub rejection: Option<VerificationError>,
}

impl SignerReport {
    #[must_use]
    pub fn verified(&self) -> bool {
        self.rejection.is_none() && self.stage_reached == Some(VerificationStage::SignatureChecked)
    }
}

/// Result of verifying a SignedData.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub signers: Vec<SignerReport>,
}

impl VerificationReport {
    #[must_use]
    pub fn new(signers: Vec<SignerReport>) -> Self {
        Self { signers }
    }

    /// Overall success: at least one signer, and every signer verified.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.signers.is_empty() && self.signers.iter().all(SignerReport::verified)
    }

    /// First rejection in signer order, if any.
    #[must_use]
    pub fn first_rejection(&self) -> Option<&VerificationError> {
        self.signers.iter().find_map(|s| s.rejection.as_ref())
    }

    /// Collapse into `Ok(())` or the first rejection.
    pub fn into_result(self) -> Result<(), VerificationError> {
        if let Some(rejection) = self.first_rejection() {
            return Err(rejection.clone());
        }
        if self.signers.is_empty() {
            return Err(VerificationError::new(
                0,
                RejectionReason::UnresolvedCertificate,
                "SignedData contains no SignerInfo",
            ));
        }
        Ok(())
    }
}
