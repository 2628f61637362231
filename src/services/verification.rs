//! Verification service: runs every SignerInfo through the stage machine.
//!
//! Codec failures and missing content surface as `SigningError`; a signer
//! that does not verify is recorded in the [`VerificationReport`] instead.

use serde::{Deserialize, Serialize};

use crate::adapters::PublicKey;
use crate::domain::asn1::DecodeMode;
use crate::domain::crypto::{
    canonicalize, AlgorithmForm, AlgorithmIdentifier, CanonicalizationError, HashAlgorithm,
    ParameterEncoding, SignatureAlgorithm,
};
use crate::domain::pkcs7::{SignedData, SignerInfo};
use crate::domain::verification::{
    RejectionReason, SignerReport, VerificationError, VerificationReport, VerificationStage,
};
use crate::domain::x509::Certificate;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::cert_builder::unix_now;

/// How the verifier resolves `signatureAlgorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierPolicy {
    /// Resolve through the canonicalization table. When false the OID must
    /// equal the one `expected_form` would produce.
    pub canonicalize: bool,
    pub expected_form: AlgorithmForm,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            canonicalize: true,
            expected_form: AlgorithmForm::Combined,
        }
    }
}

impl VerifierPolicy {
    /// A verifier that compares signature OIDs literally.
    #[must_use]
    pub fn literal(expected_form: AlgorithmForm) -> Self {
        Self {
            canonicalize: false,
            expected_form,
        }
    }
}

/// Per-signer summary for `inspect`, no keys or content involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInspection {
    pub signer_index: usize,
    pub version: u64,
    pub signer_identifier: String,
    pub digest_algorithm: AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifier,
    pub canonical: Result<SignatureAlgorithm, CanonicalizationError>,
    pub signing_time: Option<i64>,
}

/// Verifies CMS SignedData.
#[derive(Debug, Clone, Default)]
pub struct VerificationService {
    policy: VerifierPolicy,
    decode_mode: DecodeMode,
}

impl VerificationService {
    #[must_use]
    pub fn new(policy: VerifierPolicy) -> Self {
        Self {
            policy,
            decode_mode: DecodeMode::Strict,
        }
    }

    #[must_use]
    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    #[must_use]
    pub fn policy(&self) -> VerifierPolicy {
        self.policy
    }

    #[must_use]
    pub fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }

    /// Decode a ContentInfo and verify it.
    ///
    /// # Errors
    ///
    /// `MalformedEncoding` when the bytes do not decode; see [`Self::verify`].
    pub fn verify_der(
        &self,
        der: &[u8],
        content: Option<&[u8]>,
        trusted: &[Certificate],
    ) -> SigningResult<VerificationReport> {
        let signed = SignedData::from_content_info_der(der, self.decode_mode)?;
        self.verify(&signed, content, trusted)
    }

    /// Verify every signer of `signed`.
    ///
    /// `content` is required for detached signatures; otherwise the embedded
    /// content is used. Supplied `trusted` certificates are searched before
    /// the embedded ones.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when no content is available.
    pub fn verify(
        &self,
        signed: &SignedData,
        content: Option<&[u8]>,
        trusted: &[Certificate],
    ) -> SigningResult<VerificationReport> {
        let content = match (content, signed.encap_content_info().content.as_deref()) {
            (Some(supplied), _) => supplied,
            (None, Some(embedded)) => embedded,
            (None, None) => {
                return Err(SigningError::InvalidInput(
                    "detached signature requires the signed content".into(),
                ))
            }
        };

        let candidates: Vec<&Certificate> =
            trusted.iter().chain(signed.certificates().iter()).collect();

        let signers: Vec<SignerReport> = signed
            .signer_infos()
            .iter()
            .enumerate()
            .map(|(index, signer)| self.verify_signer(index, signer, signed, &candidates, content))
            .collect();

        let report = VerificationReport::new(signers);
        if report.success() {
            log::info!("Verification ok ({} signer(s))", report.signers.len());
        } else if let Some(rejection) = report.first_rejection() {
            log::warn!("Verification failed: {rejection}");
        } else {
            log::warn!("Verification failed: SignedData has no signers");
        }
        Ok(report)
    }

    /// Describe each signer's algorithms without verifying anything.
    #[must_use]
    pub fn inspect(&self, signed: &SignedData) -> Vec<SignerInspection> {
        signed
            .signer_infos()
            .iter()
            .enumerate()
            .map(|(index, signer)| SignerInspection {
                signer_index: index,
                version: signer.version,
                signer_identifier: signer.sid.to_string(),
                digest_algorithm: signer.digest_algorithm.clone(),
                signature_algorithm: signer.signature_algorithm.clone(),
                canonical: canonicalize(&signer.signature_algorithm, &signer.digest_algorithm),
                signing_time: signer
                    .signed_attrs
                    .as_ref()
                    .and_then(|attrs| attrs.signing_time().ok().flatten()),
            })
            .collect()
    }

    fn verify_signer(
        &self,
        index: usize,
        signer: &SignerInfo,
        signed: &SignedData,
        candidates: &[&Certificate],
        content: &[u8],
    ) -> SignerReport {
        let mut report = SignerReport {
            signer_index: index,
            signature_algorithm_oid: signer.signature_algorithm.oid.clone(),
            digest_algorithm_oid: signer.digest_algorithm.oid.clone(),
            canonical_algorithm: None,
            signer_subject: None,
            stage_reached: None,
            rejection: None,
        };
        log::debug!(
            "Signer #{index}: signatureAlgorithm {}, digestAlgorithm {}",
            signer.signature_algorithm,
            signer.digest_algorithm
        );
        let matching: Vec<&Certificate> = candidates
            .iter()
            .copied()
            .filter(|cert| signer.sid.matches(cert))
            .collect();
        if matching.is_empty() {
            let rejection = VerificationError::new(
                index,
                RejectionReason::UnresolvedCertificate,
                format!("no certificate matches {}", signer.sid),
            );
            log::debug!("Signer #{index}: {rejection}");
            report.rejection = Some(rejection);
            return report;
        }

        // Several certificates may share issuer and serial; any of them may verify.
        let mut first_failure: Option<SignerReport> = None;
        for cert in matching {
            let mut attempt = report.clone();
            match self.run_stages(index, signer, signed, cert, content, &mut attempt) {
                Ok(()) => {
                    log::debug!("Signer #{index} verified");
                    return attempt;
                }
                Err(rejection) => {
                    log::debug!("Signer #{index} with \"{}\": {rejection}", cert.subject());
                    if first_failure.is_none() {
                        attempt.rejection = Some(rejection);
                        first_failure = Some(attempt);
                    }
                }
            }
        }
        first_failure.unwrap_or(report)
    }

    fn run_stages(
        &self,
        index: usize,
        signer: &SignerInfo,
        signed: &SignedData,
        cert: &Certificate,
        content: &[u8],
        report: &mut SignerReport,
    ) -> Result<(), VerificationError> {
        let reject = |reason, detail: String| VerificationError::new(index, reason, detail);

        report.signer_subject = Some(cert.subject().to_string());
        report.stage_reached = Some(VerificationStage::Decoded);

        // DigestChecked: recompute and compare with messageDigest.
        let digest = HashAlgorithm::from_identifier(&signer.digest_algorithm).ok_or_else(|| {
            VerificationError::at(
                index,
                VerificationStage::DigestChecked,
                RejectionReason::UnsupportedAlgorithm,
                format!("unknown digest algorithm {}", signer.digest_algorithm),
            )
        })?;
        let content_digest = digest.digest(content);
        if let Some(attrs) = &signer.signed_attrs {
            let declared = attrs
                .message_digest()
                .map_err(|e| reject(RejectionReason::DigestMismatch, e.to_string()))?
                .ok_or_else(|| {
                    reject(
                        RejectionReason::DigestMismatch,
                        "signed attributes carry no messageDigest".into(),
                    )
                })?;
            if !content_digest.matches(&declared) {
                return Err(reject(
                    RejectionReason::DigestMismatch,
                    format!(
                        "content {digest} is {content_digest}, messageDigest is {}",
                        hex::encode(&declared)
                    ),
                ));
            }
            let content_type = attrs
                .content_type()
                .map_err(|e| reject(RejectionReason::DigestMismatch, e.to_string()))?;
            let expected_type = &signed.encap_content_info().content_type;
            if content_type.as_ref() != Some(expected_type) {
                return Err(reject(
                    RejectionReason::DigestMismatch,
                    format!("contentType attribute does not match eContentType {expected_type}"),
                ));
            }
        }
        report.stage_reached = Some(VerificationStage::DigestChecked);

        // AlgorithmResolved: canonical scheme that agrees with the key.
        let public_key = PublicKey::from_spki(cert.public_key_info())
            .map_err(|e| reject(RejectionReason::UnsupportedAlgorithm, e.to_string()))?;
        let algorithm = self
            .resolve_algorithm(signer, digest, &public_key)
            .map_err(|detail| reject(RejectionReason::UnsupportedAlgorithm, detail))?;
        report.canonical_algorithm = Some(algorithm);
        report.stage_reached = Some(VerificationStage::AlgorithmResolved);

        // SignatureChecked.
        let signed_digest = match &signer.signed_attrs {
            Some(attrs) => algorithm.digest().digest(&attrs.signature_input()),
            None => content_digest,
        };
        public_key
            .verify_digest(algorithm, signed_digest.as_slice(), &signer.signature)
            .map_err(|e| reject(RejectionReason::SignatureInvalid, e.to_string()))?;
        report.stage_reached = Some(VerificationStage::SignatureChecked);

        if !cert.is_valid_at(unix_now().unwrap_or_default()) {
            log::warn!("Signer certificate \"{}\" is outside its validity period", cert.subject());
        }
        Ok(())
    }

    fn resolve_algorithm(
        &self,
        signer: &SignerInfo,
        digest: HashAlgorithm,
        public_key: &PublicKey,
    ) -> Result<SignatureAlgorithm, String> {
        let algorithm = if self.policy.canonicalize {
            canonicalize(&signer.signature_algorithm, &signer.digest_algorithm)
                .map_err(|e| e.to_string())?
        } else {
            let expected = SignatureAlgorithm::for_key(public_key.family(), digest)
                .identifier(self.policy.expected_form, ParameterEncoding::Conventional);
            if signer.signature_algorithm.oid != expected.oid {
                return Err(format!(
                    "signatureAlgorithm {} is not the expected {}",
                    signer.signature_algorithm.oid, expected.oid
                ));
            }
            SignatureAlgorithm::for_key(public_key.family(), digest)
        };
        if algorithm.family() != public_key.family() {
            return Err(format!(
                "{algorithm} cannot be verified with the certificate's {} key",
                public_key.family()
            ));
        }
        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{PrivateKey, SoftwareKeyGenerator};
    use crate::domain::crypto::KeyAlgorithm;
    use crate::domain::x509::{CertChain, DistinguishedName};
    use crate::services::cert_builder::{CertificateBuilder, Validity};
    use crate::services::signing::{CmsSigningService, SignOptions};

    fn ec_chain(name: &str) -> (CertChain, PrivateKey) {
        let builder = CertificateBuilder::new(Box::new(SoftwareKeyGenerator));
        let validity = Validity::days_around_now(1).unwrap();
        let (root, root_key) = builder
            .create_self_signed(
                &DistinguishedName::common_name(format!("{name} root")),
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        let (leaf, key) = builder
            .create_signed(
                &DistinguishedName::common_name(name),
                &root,
                &root_key,
                1,
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        (CertChain::new(leaf).with_issuers(vec![root]), key)
    }

    fn sign(form: AlgorithmForm, content: &[u8]) -> SignedData {
        let (chain, key) = ec_chain("my signer");
        CmsSigningService::new(SignOptions {
            form,
            ..SignOptions::default()
        })
        .sign(content, &chain, &key)
        .unwrap()
    }

    #[test]
    fn test_verify_reaches_signature_checked() {
        let signed = sign(AlgorithmForm::Combined, &[1, 2, 3]);
        let report = VerificationService::default()
            .verify(&signed, Some([1u8, 2, 3].as_slice()), &[])
            .unwrap();
        assert!(report.success());
        let signer = &report.signers[0];
        assert_eq!(signer.stage_reached, Some(VerificationStage::SignatureChecked));
        assert_eq!(signer.signer_subject.as_deref(), Some("CN=my signer"));
        assert_eq!(
            signer.canonical_algorithm,
            Some(SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha256))
        );
    }

    #[test]
    fn test_tampered_content_is_digest_mismatch() {
        let signed = sign(AlgorithmForm::Combined, &[1, 2, 3]);
        let report = VerificationService::default()
            .verify(&signed, Some([1u8, 2, 4].as_slice()), &[])
            .unwrap();
        let rejection = report.into_result().unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::DigestMismatch);
        assert_eq!(rejection.stage, VerificationStage::DigestChecked);
    }

    #[test]
    fn test_missing_certificate_is_unresolved() {
        let (chain, key) = ec_chain("my signer");
        let signed = CmsSigningService::new(SignOptions {
            include: crate::domain::x509::IncludeOption::EndCertOnly,
            ..SignOptions::default()
        })
        .sign(b"x", &chain, &key)
        .unwrap();
        let stripped = SignedData::new(
            signed.digest_algorithms().to_vec(),
            signed.encap_content_info().clone(),
            Vec::new(),
            signed.signer_infos().to_vec(),
        );
        let service = VerificationService::default();
        let report = service.verify(&stripped, Some(b"x".as_slice()), &[]).unwrap();
        assert_eq!(
            report.into_result().unwrap_err().reason,
            RejectionReason::UnresolvedCertificate
        );

        // Supplying the certificate out of band resolves it.
        let report = service
            .verify(&stripped, Some(b"x".as_slice()), &[chain.leaf().clone()])
            .unwrap();
        assert!(report.success());
    }

    #[test]
    fn test_detached_without_content_is_an_error() {
        let signed = sign(AlgorithmForm::Combined, b"x");
        assert!(matches!(
            VerificationService::default().verify(&signed, None, &[]),
            Err(SigningError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_literal_policy_rejects_other_form() {
        let signed = sign(AlgorithmForm::Split, b"x");
        let literal = VerificationService::new(VerifierPolicy::literal(AlgorithmForm::Combined));
        let rejection = literal
            .verify(&signed, Some(b"x".as_slice()), &[])
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::UnsupportedAlgorithm);

        let canonical = VerificationService::new(VerifierPolicy {
            canonicalize: true,
            expected_form: AlgorithmForm::Combined,
        });
        assert!(canonical.verify(&signed, Some(b"x".as_slice()), &[]).unwrap().success());
    }

    #[test]
    fn test_inspect_reports_wire_algorithms() {
        let signed = sign(AlgorithmForm::Split, b"x");
        let inspection = VerificationService::default().inspect(&signed);
        assert_eq!(inspection.len(), 1);
        assert_eq!(
            inspection[0].signature_algorithm.oid,
            crate::domain::constants::OID_EC_PUBLIC_KEY
        );
        assert_eq!(
            inspection[0].canonical,
            Ok(SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha256))
        );
        assert!(inspection[0].signing_time.is_some());
    }

    #[test]
    fn test_one_bad_signer_fails_the_whole_report() {
        let (chain, key) = ec_chain("first");
        let (other_chain, other_key) = ec_chain("second");
        let service = CmsSigningService::default();
        let first = service.sign(b"payload", &chain, &key).unwrap();
        let mut both = service
            .co_sign(&first, b"payload", &other_chain, &other_key)
            .unwrap();

        let mut signers = both.signer_infos().to_vec();
        let last = signers[1].signature.len() - 1;
        signers[1].signature[last] ^= 0x01;
        both = SignedData::new(
            both.digest_algorithms().to_vec(),
            both.encap_content_info().clone(),
            both.certificates().to_vec(),
            signers,
        );

        let report = VerificationService::default()
            .verify(&both, Some(b"payload".as_slice()), &[])
            .unwrap();
        assert!(!report.success());
        assert_eq!(report.signers.iter().filter(|s| s.verified()).count(), 1);
    }
}
