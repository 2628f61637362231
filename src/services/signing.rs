//! CMS signing service producing detached (or attached) SignedData.
//!
//! Orchestrates the signing workflow:
//! - digest the content with the configured hash
//! - build signed attributes (contentType, messageDigest, signingTime)
//! - sign with the leaf key, emitting the signatureAlgorithm in the configured form
//! - embed certificates per the include option

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapters::PrivateKey;
use crate::domain::asn1::ObjectIdentifier;
use crate::domain::constants::OID_DATA;
use crate::domain::crypto::{
    AlgorithmForm, AlgorithmIdentifier, HashAlgorithm, KeyFamily, ParameterEncoding,
    SignatureAlgorithm,
};
use crate::domain::pkcs7::{
    Attribute, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier, SignerInfo,
};
use crate::domain::x509::{CertChain, Certificate, IncludeOption};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::cert_builder::unix_now;

/// How a SignerInfo names its certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignerIdentifierType {
    /// issuerAndSerialNumber, SignerInfo version 1.
    #[default]
    IssuerAndSerialNumber,
    /// subjectKeyIdentifier, SignerInfo version 3.
    SubjectKeyIdentifier,
}

impl fmt::Display for SignerIdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignerIdentifierType::IssuerAndSerialNumber => "issuer-and-serial-number",
            SignerIdentifierType::SubjectKeyIdentifier => "subject-key-identifier",
        })
    }
}

impl FromStr for SignerIdentifierType {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "issuer-and-serial-number" | "issuer-serial" => {
                Ok(SignerIdentifierType::IssuerAndSerialNumber)
            }
            "subject-key-identifier" | "ski" => Ok(SignerIdentifierType::SubjectKeyIdentifier),
            _ => Err(SigningError::ConfigurationError(format!(
                "unknown signer identifier type '{s}'"
            ))),
        }
    }
}

/// Signing options with all producer choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOptions {
    pub digest: HashAlgorithm,
    /// signatureAlgorithm form written into SignerInfo.
    pub form: AlgorithmForm,
    pub parameter_encoding: ParameterEncoding,
    pub include: IncludeOption,
    /// Sign a signed-attribute set rather than the content digest directly.
    pub signed_attributes: bool,
    pub identifier: SignerIdentifierType,
    pub content_type: ObjectIdentifier,
    /// signingTime value; `None` uses the current time.
    pub signing_time: Option<i64>,
    /// Omit eContent from the output.
    pub detached: bool,
    /// Signature family to produce; `None` follows the signing key.
    pub key_family: Option<KeyFamily>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            digest: HashAlgorithm::Sha256,
            form: AlgorithmForm::Combined,
            parameter_encoding: ParameterEncoding::Conventional,
            include: IncludeOption::EndCertOnly,
            signed_attributes: true,
            identifier: SignerIdentifierType::IssuerAndSerialNumber,
            content_type: OID_DATA,
            signing_time: None,
            detached: true,
            key_family: None,
        }
    }
}

/// Produces CMS SignedData values.
#[derive(Debug, Clone, Default)]
pub struct CmsSigningService {
    options: SignOptions,
}

impl CmsSigningService {
    #[must_use]
    pub fn new(options: SignOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    /// Sign `content` with the leaf of `chain`.
    ///
    /// # Errors
    ///
    /// `SignatureError` when `key` does not belong to the leaf certificate or
    /// cannot produce the requested scheme; `InvalidInput` for option
    /// combinations CMS forbids.
    pub fn sign(
        &self,
        content: &[u8],
        chain: &CertChain,
        key: &PrivateKey,
    ) -> SigningResult<SignedData> {
        let signer_info = self.build_signer_info(content, chain.leaf(), key)?;
        let encap = EncapsulatedContentInfo {
            content_type: self.options.content_type.clone(),
            content: (!self.options.detached).then(|| content.to_vec()),
        };
        let signed = SignedData::new(
            vec![AlgorithmIdentifier::for_digest(
                self.options.digest,
                self.options.parameter_encoding,
            )],
            encap,
            chain.select(self.options.include),
            vec![signer_info],
        );
        log::info!(
            "Signed {} bytes as \"{}\" ({} certificate(s) embedded, {} form)",
            content.len(),
            chain.leaf().subject(),
            signed.certificates().len(),
            self.options.form
        );
        Ok(signed)
    }

    /// Add another signer to an existing SignedData over the same content.
    pub fn co_sign(
        &self,
        existing: &SignedData,
        content: &[u8],
        chain: &CertChain,
        key: &PrivateKey,
    ) -> SigningResult<SignedData> {
        if existing.encap_content_info().content_type != self.options.content_type {
            return Err(SigningError::InvalidInput(format!(
                "existing SignedData carries {} but options request {}",
                existing.encap_content_info().content_type,
                self.options.content_type
            )));
        }
        let signer_info = self.build_signer_info(content, chain.leaf(), key)?;

        let mut digest_algorithms = existing.digest_algorithms().to_vec();
        digest_algorithms.push(AlgorithmIdentifier::for_digest(
            self.options.digest,
            self.options.parameter_encoding,
        ));
        let mut certificates = existing.certificates().to_vec();
        certificates.extend(chain.select(self.options.include));
        let mut signer_infos = existing.signer_infos().to_vec();
        signer_infos.push(signer_info);

        log::info!(
            "Added signer \"{}\" ({} signer(s) total)",
            chain.leaf().subject(),
            signer_infos.len()
        );
        Ok(SignedData::new(
            digest_algorithms,
            existing.encap_content_info().clone(),
            certificates,
            signer_infos,
        ))
    }

    fn build_signer_info(
        &self,
        content: &[u8],
        leaf: &Certificate,
        key: &PrivateKey,
    ) -> SigningResult<SignerInfo> {
        let options = &self.options;
        if key.public_key().to_spki() != *leaf.public_key_info() {
            return Err(SigningError::SignatureError(format!(
                "signing key does not match certificate \"{}\"",
                leaf.subject()
            )));
        }
        if !options.signed_attributes && options.content_type != OID_DATA {
            return Err(SigningError::InvalidInput(format!(
                "content type {} requires signed attributes",
                options.content_type
            )));
        }

        let family = options.key_family.unwrap_or_else(|| key.family());
        let algorithm = SignatureAlgorithm::for_key(family, options.digest);
        let content_digest = options.digest.digest(content);
        log::debug!("Content digest ({}): {content_digest}", options.digest);

        let (signed_attrs, to_sign) = if options.signed_attributes {
            let signing_time = match options.signing_time {
                Some(time) => time,
                None => unix_now()?,
            };
            let attrs = SignedAttributes::new(vec![
                Attribute::content_type(&options.content_type),
                Attribute::message_digest(content_digest.as_slice()),
                Attribute::signing_time(signing_time),
            ]);
            let attrs_digest = options.digest.digest(&attrs.signature_input());
            (Some(attrs), attrs_digest)
        } else {
            (None, content_digest)
        };
        let signature = key.sign_digest(algorithm, &to_sign)?;

        let sid = match options.identifier {
            SignerIdentifierType::IssuerAndSerialNumber => SignerIdentifier::issuer_and_serial(leaf),
            SignerIdentifierType::SubjectKeyIdentifier => {
                let key_id = leaf.subject_key_identifier().ok_or_else(|| {
                    SigningError::CertificateError(format!(
                        "certificate \"{}\" has no subjectKeyIdentifier",
                        leaf.subject()
                    ))
                })?;
                SignerIdentifier::SubjectKeyIdentifier(key_id)
            }
        };

        Ok(SignerInfo {
            version: sid.signer_info_version(),
            sid,
            digest_algorithm: AlgorithmIdentifier::for_digest(
                options.digest,
                options.parameter_encoding,
            ),
            signed_attrs,
            signature_algorithm: algorithm.identifier(options.form, options.parameter_encoding),
            signature: signature.into_vec(),
            unsigned_attrs: None,
        })
    }
}
