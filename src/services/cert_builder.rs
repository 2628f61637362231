//! Certificate builder: self-signed root CA and code-signing leaf.
//!
//! Key material comes from an injected [`KeyGenerator`]; the builder only
//! assembles and signs `TBSCertificate` structures. The certificate's own
//! signature algorithm always follows the issuer key (sha256WithRSAEncryption
//! or ecdsa-with-SHA256) and is unrelated to the form used inside CMS.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::adapters::{default_generator, KeyGenerator, PrivateKey};
use crate::domain::asn1::{is_encodable, Encoder};
use crate::domain::constants::{KEY_IDENTIFIER_LENGTH, OID_KP_CODE_SIGNING};
use crate::domain::crypto::{
    AlgorithmForm, AlgorithmIdentifier, HashAlgorithm, KeyAlgorithm, ParameterEncoding,
    SignatureAlgorithm,
};
use crate::domain::x509::{
    authority_key_identifier, subject_key_identifier, BasicConstraints, Certificate,
    DistinguishedName, ExtendedKeyUsage, KeyUsage, SubjectPublicKeyInfo, TbsCertificate,
    VERSION_V3,
};
use crate::infra::error::{SigningError, SigningResult};

const SECONDS_PER_DAY: i64 = 86_400;
const ROOT_SERIAL_LENGTH: usize = 16;

/// Current time as UNIX seconds.
pub fn unix_now() -> SigningResult<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SigningError::InvalidInput(format!("system clock before 1970: {e}")))?;
    i64::try_from(elapsed.as_secs())
        .map_err(|_| SigningError::InvalidInput("system clock out of range".into()))
}

/// Certificate validity window in UNIX seconds, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: i64,
    pub not_after: i64,
}

impl Validity {
    pub fn new(not_before: i64, not_after: i64) -> SigningResult<Self> {
        if not_before >= not_after {
            return Err(SigningError::InvalidInput(format!(
                "validity starts ({not_before}) at or after it ends ({not_after})"
            )));
        }
        if !is_encodable(not_before) || !is_encodable(not_after) {
            return Err(SigningError::InvalidInput(format!(
                "validity {not_before}..{not_after} lies outside 1970..=9999"
            )));
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// `days` before now until `days` after now. `days` must be at least 1.
    pub fn days_around_now(days: u32) -> SigningResult<Self> {
        if days == 0 {
            return Err(SigningError::InvalidInput(
                "validity must span at least one day".into(),
            ));
        }
        let now = unix_now()?;
        let span = i64::from(days) * SECONDS_PER_DAY;
        Self::new(now - span, now + span)
    }

    pub fn contains(&self, at: i64) -> bool {
        (self.not_before..=self.not_after).contains(&at)
    }
}

/// Key identifier for `spki`: leading bytes of SHA-256 over the key bits.
pub fn key_identifier(spki: &SubjectPublicKeyInfo) -> Vec<u8> {
    let digest = HashAlgorithm::Sha256.digest(&spki.public_key);
    digest.as_slice()[..KEY_IDENTIFIER_LENGTH].to_vec()
}

/// Issues root and leaf certificates.
pub struct CertificateBuilder {
    generator: Box<dyn KeyGenerator>,
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self::new(default_generator())
    }
}

impl CertificateBuilder {
    #[must_use]
    pub fn new(generator: Box<dyn KeyGenerator>) -> Self {
        Self { generator }
    }

    /// Create a self-signed CA certificate (basicConstraints CA, pathLen 0).
    pub fn create_self_signed(
        &self,
        subject: &DistinguishedName,
        validity: Validity,
        key_algorithm: KeyAlgorithm,
    ) -> SigningResult<(Certificate, PrivateKey)> {
        check_subject(subject)?;
        let key = self.generator.generate(key_algorithm)?;
        let spki = key.public_key().to_spki();
        let key_id = key_identifier(&spki);

        let extensions = vec![
            BasicConstraints {
                is_ca: true,
                path_len_constraint: Some(0),
            }
            .to_extension(true),
            subject_key_identifier(&key_id),
        ];

        let tbs = TbsCertificate {
            version: VERSION_V3,
            serial_number: random_serial(),
            signature: certificate_signature_algorithm(&key),
            issuer: subject.clone(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            subject: subject.clone(),
            subject_public_key_info: spki,
            extensions,
        };
        let cert = sign_tbs(tbs, &key)?;
        log::info!(
            "Created self-signed certificate \"{subject}\" ({}) via {} generator",
            key_algorithm,
            self.generator.name()
        );
        Ok((cert, key))
    }

    /// Create a code-signing certificate issued by `issuer_cert`.
    ///
    /// keyUsage is digitalSignature only (non-critical); extendedKeyUsage is
    /// code signing (critical).
    pub fn create_signed(
        &self,
        subject: &DistinguishedName,
        issuer_cert: &Certificate,
        issuer_key: &PrivateKey,
        serial: u64,
        validity: Validity,
        key_algorithm: KeyAlgorithm,
    ) -> SigningResult<(Certificate, PrivateKey)> {
        check_subject(subject)?;
        if issuer_key.public_key().to_spki() != *issuer_cert.public_key_info() {
            return Err(SigningError::CertificateError(format!(
                "issuer key does not belong to \"{}\"",
                issuer_cert.subject()
            )));
        }
        if !issuer_cert.is_ca() {
            log::warn!(
                "Issuer \"{}\" is not marked as a CA; issuing anyway",
                issuer_cert.subject()
            );
        }

        let key = self.generator.generate(key_algorithm)?;
        let spki = key.public_key().to_spki();
        let authority_id = issuer_cert
            .subject_key_identifier()
            .unwrap_or_else(|| key_identifier(issuer_cert.public_key_info()));

        let extensions = vec![
            KeyUsage(KeyUsage::DIGITAL_SIGNATURE).to_extension(false),
            ExtendedKeyUsage {
                purposes: vec![OID_KP_CODE_SIGNING],
            }
            .to_extension(true),
            subject_key_identifier(&key_identifier(&spki)),
            authority_key_identifier(&authority_id),
        ];

        let tbs = TbsCertificate {
            version: VERSION_V3,
            serial_number: Encoder::integer_content(&serial.to_be_bytes()),
            signature: certificate_signature_algorithm(issuer_key),
            issuer: issuer_cert.subject().clone(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            subject: subject.clone(),
            subject_public_key_info: spki,
            extensions,
        };
        let cert = sign_tbs(tbs, issuer_key)?;
        log::info!(
            "Issued certificate \"{subject}\" (serial {serial}, {key_algorithm}) from \"{}\"",
            issuer_cert.subject()
        );
        Ok((cert, key))
    }
}

fn check_subject(subject: &DistinguishedName) -> SigningResult<()> {
    if subject.is_empty() {
        return Err(SigningError::InvalidInput(
            "certificate subject must not be empty".into(),
        ));
    }
    Ok(())
}

fn certificate_signature_algorithm(issuer_key: &PrivateKey) -> AlgorithmIdentifier {
    SignatureAlgorithm::for_key(issuer_key.family(), HashAlgorithm::Sha256)
        .identifier(AlgorithmForm::Combined, ParameterEncoding::Conventional)
}

fn sign_tbs(tbs: TbsCertificate, issuer_key: &PrivateKey) -> SigningResult<Certificate> {
    let algorithm = SignatureAlgorithm::for_key(issuer_key.family(), HashAlgorithm::Sha256);
    let signature_algorithm = tbs.signature.clone();
    let tbs_der = crate::domain::asn1::encode_der(&tbs);
    let signature = issuer_key.sign_digest(algorithm, &HashAlgorithm::Sha256.digest(&tbs_der))?;
    Ok(Certificate::new(tbs, signature_algorithm, signature.into_vec()))
}

/// Positive random serial of [`ROOT_SERIAL_LENGTH`] octets.
fn random_serial() -> Vec<u8> {
    let mut bytes = [0u8; ROOT_SERIAL_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    bytes[0] &= 0x7F;
    bytes[0] |= 0x01;
    Encoder::integer_content(&bytes)
}
