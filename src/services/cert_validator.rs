//! Certificate validation service.
//!
//! Checks a certificate's suitability for code signing. This is advisory
//! only: trust-store and revocation checks are out of scope, and the
//! verifier never rejects a signer based on this analysis.

use crate::adapters::PublicKey;
use crate::domain::constants::OID_KP_CODE_SIGNING;
use crate::domain::crypto::{canonicalize, AlgorithmIdentifier, HashAlgorithm};
use crate::domain::x509::{Certificate, KeyUsage};
use crate::infra::error::{SigningError, SigningResult};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct CertificateAnalysis {
    pub is_code_signing_suitable: bool,
    pub days_until_expiry: i64,
    pub has_proper_key_usage: bool,
    pub can_digital_sign: bool,
    pub has_code_signing_eku: bool,
    pub warnings: Vec<String>,
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub fingerprint: String,
}

pub struct CertificateValidator;

impl CertificateValidator {
    /// Analyse `certificate` as of UNIX time `now`.
    pub fn validate_for_code_signing(
        certificate: &Certificate,
        now: i64,
    ) -> SigningResult<CertificateAnalysis> {
        let mut analysis = CertificateAnalysis {
            is_code_signing_suitable: false,
            days_until_expiry: (certificate.tbs.not_after - now).div_euclid(SECONDS_PER_DAY),
            has_proper_key_usage: false,
            can_digital_sign: false,
            has_code_signing_eku: false,
            warnings: Vec::new(),
            subject: certificate.subject().to_string(),
            issuer: certificate.issuer().to_string(),
            serial_number: hex::encode(certificate.serial_number()),
            fingerprint: certificate.fingerprint(),
        };

        log::info!("Performing certificate validation for code signing");
        log::debug!("Certificate subject: {}", analysis.subject);
        log::debug!("Certificate issuer: {}", analysis.issuer);

        if now < certificate.tbs.not_before {
            analysis
                .warnings
                .push("Certificate is not yet valid".to_string());
        }
        if analysis.days_until_expiry < 0 {
            analysis
                .warnings
                .push("Certificate has expired".to_string());
        } else if analysis.days_until_expiry < 30 {
            analysis.warnings.push(format!(
                "Certificate expires in {} days",
                analysis.days_until_expiry
            ));
        }

        match certificate.key_usage()? {
            Some(usage) => {
                analysis.can_digital_sign = usage.has(KeyUsage::DIGITAL_SIGNATURE);
                analysis.has_proper_key_usage = analysis.can_digital_sign;
            }
            None => {
                // Without keyUsage every usage is permitted.
                analysis.can_digital_sign = true;
            }
        }
        if !analysis.has_proper_key_usage {
            analysis
                .warnings
                .push("Certificate lacks a digitalSignature key usage".to_string());
        }
        if !analysis.can_digital_sign {
            analysis
                .warnings
                .push("Certificate cannot be used for digital signatures".to_string());
        }

        analysis.has_code_signing_eku = certificate
            .extended_key_usage()?
            .is_some_and(|eku| eku.contains(&OID_KP_CODE_SIGNING));
        if !analysis.has_code_signing_eku {
            analysis
                .warnings
                .push("Certificate lacks Code Signing Extended Key Usage".to_string());
        }

        if certificate.is_self_issued() {
            analysis
                .warnings
                .push("Certificate is self-signed - may not be trusted by all systems".to_string());
        }

        analysis.is_code_signing_suitable = certificate.is_valid_at(now)
            && analysis.can_digital_sign
            && (analysis.has_proper_key_usage || analysis.has_code_signing_eku);

        if analysis.is_code_signing_suitable {
            log::info!("Certificate is suitable for code signing");
        } else {
            log::warn!("Certificate is NOT suitable for code signing");
            for warning in &analysis.warnings {
                log::warn!("  - {warning}");
            }
        }

        Ok(analysis)
    }

    /// True when `issuer`'s key produced `certificate`'s signature and the
    /// names chain.
    pub fn verify_issued_by(certificate: &Certificate, issuer: &Certificate) -> SigningResult<bool> {
        if certificate.issuer() != issuer.subject() {
            return Ok(false);
        }
        let algorithm = canonicalize(
            &certificate.signature_algorithm,
            &AlgorithmIdentifier::null(HashAlgorithm::Sha256.oid()),
        )
        .map_err(|e| SigningError::UnsupportedAlgorithm(e.to_string()))?;
        let public_key = PublicKey::from_spki(issuer.public_key_info())?;
        let digest = algorithm.digest().digest(certificate.tbs_der());
        Ok(public_key
            .verify_digest(algorithm, digest.as_slice(), &certificate.signature_value)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::KeyAlgorithm;
    use crate::domain::x509::DistinguishedName;
    use crate::services::cert_builder::{unix_now, CertificateBuilder, Validity};

    #[test]
    fn test_leaf_is_suitable_and_root_is_not() {
        let builder = CertificateBuilder::default();
        let validity = Validity::days_around_now(1).unwrap();
        let (root, root_key) = builder
            .create_self_signed(
                &DistinguishedName::common_name("my root"),
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        let (leaf, _) = builder
            .create_signed(
                &DistinguishedName::common_name("my signer"),
                &root,
                &root_key,
                1,
                validity,
                KeyAlgorithm::EcP256,
            )
            .unwrap();
        let now = unix_now().unwrap();

        let analysis = CertificateValidator::validate_for_code_signing(&leaf, now).unwrap();
        assert!(analysis.is_code_signing_suitable);
        assert!(analysis.has_code_signing_eku);
        assert_eq!(analysis.serial_number, "01");

        let root_analysis = CertificateValidator::validate_for_code_signing(&root, now).unwrap();
        assert!(!root_analysis.has_code_signing_eku);

        assert!(CertificateValidator::verify_issued_by(&leaf, &root).unwrap());
        assert!(!CertificateValidator::verify_issued_by(&root, &leaf).unwrap());

        let expired = CertificateValidator::validate_for_code_signing(&leaf, now + 10 * SECONDS_PER_DAY)
            .unwrap();
        assert!(!expired.is_code_signing_suitable);
        assert!(expired.days_until_expiry < 0);
    }
}
